use anyhow::{bail, Context, Result};
use env_logger::Env;
use fgpct_bptree::{bench, loader, optimal_degree, BPlusTree, RecordPointer, Storage};
use std::cell::RefCell;
use std::rc::Rc;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = std::env::args().collect::<Vec<_>>();
    match args.len() {
        0 | 1 => bail!("Missing <command>"),
        _ => {}
    }

    match args[1].as_str() {
        "build" => build(&args[2..]),
        "stats" => stats(&args[2..]),
        "bench" => run_bench(&args[2..]),
        other => bail!("Unknown command: {other}"),
    }
}

/// `build <data.txt> <storage_dir> [degree]`
///
/// Loads records, writes the data pages, bulk-inserts into a fresh tree, and
/// reports the same storage statistics the original's `reportStatistics`
/// prints after a load.
fn build(args: &[String]) -> Result<()> {
    let [data_path, storage_dir, degree_arg @ ..] = args else {
        bail!("usage: build <data.txt> <storage_dir> [degree]");
    };

    std::fs::create_dir_all(storage_dir).with_context(|| format!("creating {storage_dir}"))?;
    let storage = Rc::new(RefCell::new(Storage::new(storage_dir, 0, 0, 0)));
    let degree = resolve_degree(degree_arg, storage.borrow().page_size())?;

    let (records, skipped) = loader::load_records_from_path(data_path)?;
    println!("Loaded {} records, skipped {skipped} malformed lines", records.len());

    let record_count = records.len();
    let record_size = fgpct_bptree::Record::SIZE;
    let page_size = storage.borrow().page_size();
    let records_per_block = fgpct_bptree::DataBlock::max_records_per_block(page_size);

    let block_count = storage.borrow_mut().write_data_blocks(records.clone())?;

    let mut tree = BPlusTree::new(storage.clone(), degree)?;
    for (i, record) in records.iter().enumerate() {
        let block_id = (i / records_per_block.max(1)) as i32;
        let offset = (i % records_per_block.max(1)) as u16;
        tree.insert(record.fg_pct_home, RecordPointer { block_id, offset })?;
    }
    storage.borrow_mut().flush_blocks()?;

    println!("Record size (bytes): {record_size}");
    println!("Record count: {record_count}");
    println!("Records per block: {records_per_block}");
    println!("Block count: {block_count}");
    println!("Tree degree: {degree}");
    println!("Tree root block id: {}", tree.root_block_id());

    Ok(())
}

/// `stats <storage_dir> <degree> <root_block_id>`
fn stats(args: &[String]) -> Result<()> {
    let [storage_dir, degree, root_block_id] = args else {
        bail!("usage: stats <storage_dir> <degree> <root_block_id>");
    };
    let degree: u16 = degree.parse().context("degree must be an integer")?;
    let root_block_id: i32 = root_block_id.parse().context("root_block_id must be an integer")?;

    let storage = Rc::new(RefCell::new(Storage::new(storage_dir, 0, 0, 0)));
    let tree = BPlusTree::open(storage, degree, root_block_id);

    println!("Height: {}", tree.get_height()?);
    println!("Number of nodes: {}", tree.get_number_of_nodes()?);
    println!("Root keys: {:?}", tree.get_root_keys()?);
    println!("Degree: {}", tree.get_degree());

    Ok(())
}

/// `bench <storage_dir> <degree> <root_block_id> <min> <max> <block_count>`
fn run_bench(args: &[String]) -> Result<()> {
    let [storage_dir, degree, root_block_id, min, max, block_count] = args else {
        bail!("usage: bench <storage_dir> <degree> <root_block_id> <min> <max> <block_count>");
    };
    let degree: u16 = degree.parse().context("degree must be an integer")?;
    let root_block_id: i32 = root_block_id.parse().context("root_block_id must be an integer")?;
    let min: f32 = min.parse().context("min must be a float")?;
    let max: f32 = max.parse().context("max must be a float")?;
    let block_count: usize = block_count.parse().context("block_count must be an integer")?;

    let storage = Rc::new(RefCell::new(Storage::new(storage_dir, block_count as i32, 0, 0)));
    let tree = BPlusTree::open(storage.clone(), degree, root_block_id);

    let brute_force = bench::run_brute_force_bench(storage.clone(), block_count, min, max)?;
    let indexed = bench::run_indexed_bench(storage.clone(), &tree, min, max)?;

    println!("=== Brute-force scan ===");
    report(&brute_force);
    println!("=== Indexed scan ===");
    report(&indexed);

    Ok(())
}

fn report(result: &bench::BenchResult) {
    println!("Trials run: {}", result.trials);
    println!("Average time: {:?}", result.avg_duration);
    println!("Rows matched: {}", result.matched);
    println!("Average fg_pct_home: {}", result.average());
    println!("Index block accesses: {}", result.index_block_accesses);
    println!("Data block accesses: {}", result.data_block_accesses);
}

fn resolve_degree(degree_arg: &[String], page_size: usize) -> Result<u16> {
    match degree_arg {
        [] => Ok(optimal_degree(page_size) as u16),
        [raw] => raw.parse().context("degree must be an integer"),
        _ => bail!("too many arguments after <storage_dir>"),
    }
}
