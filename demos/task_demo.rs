//! Task demo: global handler, hex dump and panic capture
//!
//! Run with `cargo run --example task_demo`; logs land in `./logs`.

use rand::Rng;
use rust_stream_logger::{dump, global, log, LogLevel, Options, Result};

fn task() -> Result<()> {
    let stream = global::open("task.log")?;

    stream.catch_with(
        || {
            let mut buf = [0u8; 512];
            rand::thread_rng().fill(&mut buf[..]);
            dump!(stream, &buf, "{} bytes of random data", buf.len());
            panic!("something went wrong");
        },
        |stream, err| {
            if let Some(err) = err {
                println!("caught a panic:\n{}", err);
                log!(stream, "[CATCH] {}", err);
            }
            stream.write("program quitting...");
        },
    );

    stream.flush()?;
    println!("flushed: {}", stream.path().display());
    Ok(())
}

fn main() -> Result<()> {
    global::init(
        "logs",
        LogLevel::Trace,
        Options::new().with_split_size(10240).with_keep(3),
    )?;
    println!("logs are stored at: {}", global::path()?.display());

    let app = global::open("app.log")?;
    app.write("Application launched");
    task()?;
    app.write("Task finished");

    global::finish()
}
