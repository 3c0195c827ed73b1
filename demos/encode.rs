//! Reference encode front-end.
//!
//! The video codec layer is a collaborator of the library, not part of it;
//! this demo stores the packet stream as length-prefixed blobs instead of
//! rendering them into frames.

use framevault::core::{Config, FileId};
use framevault::sender::Sender;
use std::io::Write;

fn format_size(bytes: u64) -> String {
    let units = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < units.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, units[unit])
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {} --input <file> --output <packets> [--encrypt --password <pwd>]",
        program
    );
}

fn main() {
    std::env::set_var("RUST_LOG", "info");
    env_logger::builder().is_test(true).try_init().ok();

    let args: Vec<String> = std::env::args().collect();
    let mut input_path = String::new();
    let mut output_path = String::new();
    let mut encrypt = false;
    let mut password = String::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" if i + 1 < args.len() => {
                i += 1;
                input_path = args[i].clone();
            }
            "--output" | "-o" if i + 1 < args.len() => {
                i += 1;
                output_path = args[i].clone();
            }
            "--encrypt" | "-e" => encrypt = true,
            "--password" | "-p" if i + 1 < args.len() => {
                i += 1;
                password = args[i].clone();
            }
            arg => {
                eprintln!("Error: unknown or incomplete argument '{}'", arg);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if input_path.is_empty() || output_path.is_empty() {
        eprintln!("Error: both --input and --output must be specified");
        print_usage(&args[0]);
        std::process::exit(1);
    }

    if encrypt && password.is_empty() {
        eprintln!("Error: --encrypt requires --password");
        std::process::exit(1);
    }

    let input = std::path::Path::new(&input_path);
    let input_size = match input.metadata() {
        Ok(meta) => meta.len(),
        Err(_) => {
            eprintln!("Error: input file not found: {}", input_path);
            std::process::exit(1);
        }
    };
    println!("Input: {} ({})", input_path, format_size(input_size));

    let file_id = FileId::random();
    let pwd = match encrypt {
        true => Some(password.as_str()),
        false => None,
    };
    let mut sender = match Sender::from_file(input, file_id, &Config::default(), pwd) {
        Ok(sender) => sender,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Chunks: {}", sender.chunk_count());

    let packets = match sender.encode_all() {
        Ok(packets) => packets,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Packets: {}", packets.len());

    let mut out = match std::fs::File::create(&output_path) {
        Ok(file) => std::io::BufWriter::new(file),
        Err(e) => {
            eprintln!("Error: could not open {} for writing: {}", output_path, e);
            std::process::exit(1);
        }
    };
    for pkt in &packets {
        let result = out
            .write_all(&(pkt.len() as u32).to_le_bytes())
            .and_then(|_| out.write_all(pkt));
        if let Err(e) = result {
            eprintln!("Error writing packets: {}", e);
            std::process::exit(1);
        }
    }
    if let Err(e) = out.flush() {
        eprintln!("Error writing packets: {}", e);
        std::process::exit(1);
    }

    let output_size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
    println!(
        "\nEncode complete: {} -> {}",
        format_size(input_size),
        format_size(output_size)
    );
    println!("Written to: {}", output_path);
}
