use std::sync::mpsc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::queue;

pub fn run(handle: &Handle) -> Result<(), String> {
    let jobs = queue("demo.panics", handle);
    let (tx, rx) = mpsc::channel::<()>();

    jobs.spawn(move || {
        let _held_until_unwind = tx;
        let values: Vec<u32> = Vec::new();
        println!("job: reading the first value of an empty batch");
        let first = values[0];
        println!("job: first value is {first}");
    });

    match rx.recv_timeout(Duration::from_secs(5)) {
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            println!("the job panicked; its chain was printed if fault reporting is on");
            Ok(())
        }
        other => Err(format!("expected the job to panic, got {other:?}")),
    }
}
