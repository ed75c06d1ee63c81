//! Brute-force vs. indexed range-scan comparison.
//!
//! Grounded in the original `task.cpp`/`task.h`'s trial-and-report loop:
//! flush storage before every trial so the page-access counters start from
//! zero, run the scan, then read `loaded_*_block_count` as the access
//! metrics. Repeats until 1000 trials or 30 seconds elapsed, whichever comes
//! first, and reports the average wall-clock time alongside the final
//! trial's counters.

use crate::btree::BPlusTree;
use crate::error::Result;
use crate::storage::Storage;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

const MAX_TRIALS: usize = 1000;
const MAX_WALL_CLOCK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BenchResult {
    pub trials: usize,
    pub avg_duration: Duration,
    pub matched: usize,
    pub sum: f64,
    pub index_block_accesses: usize,
    pub data_block_accesses: usize,
}

impl BenchResult {
    pub fn average(&self) -> f64 {
        if self.matched == 0 {
            0.0
        } else {
            self.sum / self.matched as f64
        }
    }
}

/// Scans every tracked data block, filtering by `min <= fg_pct_home <= max`.
/// Reads every block through `Storage` (never a manually incremented
/// counter), so `loaded_data_block_count` afterward is an accurate access
/// count.
pub fn brute_force_scan(storage: &mut Storage, block_count: usize, min: f32, max: f32) -> Result<(usize, f64)> {
    let mut matched = 0;
    let mut sum = 0.0f64;
    for block_id in 0..block_count as i32 {
        let block = storage.get_data_block(block_id)?;
        for record in &block.records {
            if record.fg_pct_home >= min && record.fg_pct_home <= max {
                matched += 1;
                sum += record.fg_pct_home as f64;
            }
        }
    }
    Ok((matched, sum))
}

/// Positions the tree at `lower_bound(min)` and walks forward while
/// `fg_pct_home <= max`, matching §4.8's stepping description exactly.
pub fn indexed_scan(tree: &BPlusTree, min: f32, max: f32) -> Result<(usize, f64)> {
    let mut matched = 0;
    let mut sum = 0.0f64;
    for record in tree.search(min)? {
        let record = record?;
        if record.fg_pct_home > max {
            break;
        }
        matched += 1;
        sum += record.fg_pct_home as f64;
    }
    Ok((matched, sum))
}

pub fn run_brute_force_bench(storage: Rc<RefCell<Storage>>, block_count: usize, min: f32, max: f32) -> Result<BenchResult> {
    let mut trials = 0;
    let mut total = Duration::ZERO;
    let mut last = (0usize, 0.0f64);
    let wall_clock_start = Instant::now();

    while trials < MAX_TRIALS && wall_clock_start.elapsed() < MAX_WALL_CLOCK {
        storage.borrow_mut().flush_blocks()?;
        let trial_start = Instant::now();
        last = brute_force_scan(&mut storage.borrow_mut(), block_count, min, max)?;
        total += trial_start.elapsed();
        trials += 1;
    }

    let storage = storage.borrow();
    Ok(BenchResult {
        trials,
        avg_duration: total / trials.max(1) as u32,
        matched: last.0,
        sum: last.1,
        index_block_accesses: storage.loaded_index_block_count(),
        data_block_accesses: storage.loaded_data_block_count(),
    })
}

pub fn run_indexed_bench(storage: Rc<RefCell<Storage>>, tree: &BPlusTree, min: f32, max: f32) -> Result<BenchResult> {
    let mut trials = 0;
    let mut total = Duration::ZERO;
    let mut last = (0usize, 0.0f64);
    let wall_clock_start = Instant::now();

    while trials < MAX_TRIALS && wall_clock_start.elapsed() < MAX_WALL_CLOCK {
        storage.borrow_mut().flush_blocks()?;
        let trial_start = Instant::now();
        last = indexed_scan(tree, min, max)?;
        total += trial_start.elapsed();
        trials += 1;
    }

    let storage = storage.borrow();
    Ok(BenchResult {
        trials,
        avg_duration: total / trials.max(1) as u32,
        matched: last.0,
        sum: last.1,
        index_block_accesses: storage.loaded_index_block_count(),
        data_block_accesses: storage.loaded_data_block_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DataBlock, Record, RecordPointer};

    fn sample(fg: f32) -> Record {
        Record {
            game_date_est: 20230101,
            team_id_home: 1,
            fg_pct_home: fg,
            ft_pct_home: 0.7,
            fg3_pct_home: 0.3,
            ast_home: 20,
            reb_home: 40,
            pts_home: 100,
            home_team_wins: true,
        }
    }

    fn tempdir() -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "fgpct_bptree_bench_test_{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn brute_force_and_indexed_scans_agree() {
        let storage = Rc::new(RefCell::new(Storage::new(tempdir(), 0, 0, 0)));
        let mut tree = BPlusTree::new(storage.clone(), 5).unwrap();

        let keys: Vec<f32> = (1..=50).map(|i| i as f32 / 100.0).collect();
        for key in &keys {
            let block_id = {
                let mut s = storage.borrow_mut();
                let mut block = DataBlock::new(-1);
                block.records.push(sample(*key));
                s.data.track_new(block)
            };
            tree.insert(*key, RecordPointer { block_id, offset: 0 }).unwrap();
        }

        let block_count = storage.borrow().data.loaded_count();
        let (bf_matched, bf_sum) = brute_force_scan(&mut storage.borrow_mut(), block_count, 0.10, 0.30).unwrap();
        let (idx_matched, idx_sum) = indexed_scan(&tree, 0.10, 0.30).unwrap();

        assert_eq!(bf_matched, idx_matched);
        assert!((bf_sum - idx_sum).abs() < 1e-6);
        assert_eq!(bf_matched, 21); // 0.10..=0.30 inclusive, step 0.01
    }
}
