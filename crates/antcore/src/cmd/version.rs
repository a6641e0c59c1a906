use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("antcore {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: antcore");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("ANTCORE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "serial: {}",
        if cfg!(unix) { "termios" } else { "unsupported" }
    );
    println!(
        "features: async={}, cli=true",
        cfg!(feature = "async")
    );
    println!(
        "queues: capacity={}, read_chunk={}",
        antcore_event::DEFAULT_QUEUE_CAPACITY,
        antcore_event::DEFAULT_READ_CHUNK_SIZE
    );

    Ok(SUCCESS)
}
