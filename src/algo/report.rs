//! Tabular outputs: ranked topic terms, the topic grid, and the objective trace.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::algo::topics::{grid_shape, Topic};
use crate::error::Result;

pub const TOPICS_FILE: &str = "topics.csv";
pub const GRID_FILE: &str = "topics_grid.csv";
pub const OBJECTIVE_FILE: &str = "objective.csv";

/// Long format: one `topic,rank,term,weight` row per ranked term. Rank is 1-based.
pub fn write_topics<W: Write>(out: W, topics: &[Topic]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["topic", "rank", "term", "weight"])?;
    for topic in topics {
        for (rank, term) in topic.terms.iter().enumerate() {
            wtr.write_record(&[
                topic.id.to_string(),
                (rank + 1).to_string(),
                term.term.clone(),
                format!("{:.4}", term.weight),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Topics laid out row-major in a near-square grid, one topic summary per cell.
pub fn write_topic_grid<W: Write>(out: W, topics: &[Topic]) -> Result<()> {
    let (rows, cols) = grid_shape(topics.len());
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec![String::new()];
    header.extend((0..cols).map(|c| c.to_string()));
    wtr.write_record(&header)?;

    for row in 0..rows {
        let mut record = vec![row.to_string()];
        record.extend((0..cols).map(|col| {
            topics
                .get(row * cols + col)
                .map(Topic::summary)
                .unwrap_or_default()
        }));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `iteration,objective`, one row per completed iteration (0-based).
pub fn write_objective<W: Write>(out: W, trace: &[f64]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["iteration", "objective"])?;
    for (i, value) in trace.iter().enumerate() {
        wtr.write_record(&[i.to_string(), value.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write all three tables into `dir`, creating it if needed.
pub fn write_all(dir: &Path, topics: &[Topic], trace: &[f64]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let topics_path = dir.join(TOPICS_FILE);
    write_topics(File::create(&topics_path)?, topics)?;

    let grid_path = dir.join(GRID_FILE);
    write_topic_grid(File::create(&grid_path)?, topics)?;

    let objective_path = dir.join(OBJECTIVE_FILE);
    write_objective(File::create(&objective_path)?, trace)?;

    info!(dir = %dir.display(), "wrote topic reports");
    Ok(vec![topics_path, grid_path, objective_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::topics::TermWeight;

    fn topic(id: usize, terms: &[(&str, f64)]) -> Topic {
        Topic {
            id,
            terms: terms
                .iter()
                .enumerate()
                .map(|(index, (term, weight))| TermWeight {
                    index,
                    term: term.to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }

    #[test]
    fn topics_long_format() {
        let topics = vec![topic(0, &[("rust", 0.5), ("cargo", 0.25)]), topic(1, &[("web", 0.9)])];
        let mut buf = Vec::new();
        write_topics(&mut buf, &topics).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "topic,rank,term,weight\n0,1,rust,0.5000\n0,2,cargo,0.2500\n1,1,web,0.9000\n"
        );
    }

    #[test]
    fn grid_pads_missing_cells() {
        let topics: Vec<Topic> = (0..3).map(|i| topic(i, &[("t", 0.1)])).collect();
        let mut buf = Vec::new();
        write_topic_grid(&mut buf, &topics).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // 3 topics -> 2x2 grid
        assert_eq!(lines[0], ",0,1");
        assert_eq!(lines[1], "0,t:0.1,t:0.1");
        assert_eq!(lines[2], "1,t:0.1,");
    }

    #[test]
    fn grid_quotes_multi_term_cells() {
        let topics = vec![topic(0, &[("a", 0.5), ("b", 0.25)])];
        let mut buf = Vec::new();
        write_topic_grid(&mut buf, &topics).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"a:0.5, b:0.25\""));
    }

    #[test]
    fn objective_rows_in_order() {
        let mut buf = Vec::new();
        write_objective(&mut buf, &[3.5, 2.0]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "iteration,objective\n0,3.5\n1,2\n");
    }
}
