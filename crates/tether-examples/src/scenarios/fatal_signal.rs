use std::time::Duration;

use tokio::runtime::Handle;

use super::queue;

pub fn run(handle: &Handle, signal: libc::c_int) -> Result<(), String> {
    let jobs = queue("demo.jobs", handle);
    let follow_up = jobs.clone();

    jobs.spawn(move || {
        println!("job: scheduling the follow-up that will crash");
        follow_up.spawn(move || {
            println!("follow-up: raising signal {signal}");
            // SAFETY: raising a signal on the current thread.
            unsafe {
                libc::raise(signal);
            }
        });
    });

    std::thread::sleep(Duration::from_secs(5));
    Err("the process survived its fatal signal".to_owned())
}
