use std::sync::mpsc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::{Queue, queue};

fn parse_request(ingest: Queue, storage: Queue, done: mpsc::Sender<()>) {
    println!("ingest: parsed request, handing off to storage");
    storage.spawn_after(Duration::from_millis(10), move || {
        write_record(ingest, done);
    });
}

fn write_record(ingest: Queue, done: mpsc::Sender<()>) {
    println!("storage: record written, acknowledging on ingest");
    ingest.spawn_barrier_f(done, acknowledge);
}

fn acknowledge(done: mpsc::Sender<()>) {
    println!("ingest: acknowledging; chain so far:");
    tether::print_chain();
    let _ = done.send(());
}

pub fn run(handle: &Handle) -> Result<(), String> {
    let ingest = queue("demo.ingest", handle);
    let storage = queue("demo.storage", handle);
    let (done_tx, done_rx) = mpsc::channel();

    let first_hop = ingest.clone();
    ingest.spawn(move || parse_request(first_hop, storage, done_tx));

    done_rx
        .recv_timeout(Duration::from_secs(5))
        .map_err(|e| format!("handoff chain did not complete: {e}"))
}
