//! Whitespace-delimited fixture loader for NBA game-log text files.
//!
//! Grounded in the original `storage/data_block.cpp`'s `read_records_from_file`
//! (as opposed to `storage.cpp`'s earlier, buggy date-conversion revision —
//! see the note on `parse_line` below). Malformed lines are skipped and
//! counted, never fatal; only an unopenable path is an error, matching
//! §7's Input taxonomy.

use crate::record::Record;
use anyhow::{Context, Result};
use log::warn;
use std::io::BufRead;
use std::path::Path;

/// Reads `path`, skipping its header line, parsing one `Record` per
/// subsequent line. Returns the parsed records plus a count of lines
/// skipped for any parse failure.
pub fn load_records_from_path(path: impl AsRef<Path>) -> Result<(Vec<Record>, usize)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut lines = reader.lines();
    lines.next(); // header

    let mut records = Vec::new();
    let mut skipped = 0;
    for line in lines {
        let line = line.with_context(|| format!("reading a line of {}", path.display()))?;
        match parse_line(&line) {
            Some(record) => records.push(record),
            None => {
                warn!("loader: skipping malformed line: {line:?}");
                skipped += 1;
            }
        }
    }
    Ok((records, skipped))
}

/// Field order matches the original's `>>` extraction chain:
/// `game_date_est team_id_home pts_home fg_pct_home ft_pct_home
/// fg3_pct_home ast_home reb_home home_team_wins`.
fn parse_line(line: &str) -> Option<Record> {
    let mut fields = line.split_whitespace();
    let game_date_est = parse_date(fields.next()?)?;
    let team_id_home = fields.next()?.parse::<u32>().ok()?;
    let pts_home = fields.next()?.parse::<u16>().ok()?;
    let fg_pct_home = fields.next()?.parse::<f32>().ok()?;
    let ft_pct_home = fields.next()?.parse::<f32>().ok()?;
    let fg3_pct_home = fields.next()?.parse::<f32>().ok()?;
    let ast_home = fields.next()?.parse::<u16>().ok()?;
    let reb_home = fields.next()?.parse::<u16>().ok()?;
    let home_team_wins = parse_bool(fields.next()?)?;

    Some(Record {
        game_date_est,
        team_id_home,
        fg_pct_home,
        ft_pct_home,
        fg3_pct_home,
        ast_home,
        reb_home,
        pts_home,
        home_team_wins,
    })
}

/// Converts `DD/MM/YYYY` into the `YYYYMMDD` decimal encoding
/// `Record::game_date_est` expects, using the final `data_block.cpp`
/// formula `(year * 10000) + (month * 100) + day` — not the earlier,
/// superseded `storage.cpp` revision's `(day*1000000)+(month*10000)+year`.
fn parse_date(raw: &str) -> Option<u32> {
    let mut parts = raw.split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some((year * 10000) + (month * 100) + day)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" | "True" | "TRUE" => Some(true),
        "0" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "fgpct_bptree_loader_test_{:x}.txt",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{contents}").unwrap();
        path
    }

    #[test]
    fn parses_well_formed_lines_and_skips_bad_ones() {
        let path = fixture(concat!(
            "game_date_est team_id_home pts_home fg_pct_home ft_pct_home fg3_pct_home ast_home reb_home home_team_wins\n",
            "15/01/2023 1610612737 110 0.55 0.80 0.40 25 44 1\n",
            "this line has too few columns\n",
            "16/01/2023 1610612738 105 notanumber 0.75 0.35 22 40 0\n",
            "17/01/2023 1610612739 120 0.60 0.85 0.45 30 50 true\n",
        ));
        let (records, skipped) = load_records_from_path(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 2);
        assert_eq!(records[0].game_date_est, 20230115);
        assert_eq!(records[0].fg_pct_home, 0.55);
        assert!(records[0].home_team_wins);
        assert_eq!(records[1].game_date_est, 20230117);
        assert!(records[1].home_team_wins);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn date_conversion_uses_the_final_yyyymmdd_formula() {
        assert_eq!(parse_date("05/03/2024"), Some(20240305));
        assert_eq!(parse_date("31/12/1999"), Some(19991231));
        assert_eq!(parse_date("not/a/date"), None);
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(load_records_from_path("/nonexistent/path/does-not-exist.txt").is_err());
    }
}
