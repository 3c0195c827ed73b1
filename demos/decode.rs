//! Reference decode front-end.
//!
//! Reads the length-prefixed packet container written by the encode demo
//! and feeds every blob to the receiver, the way a video decoder would
//! yield candidate packets per frame.

use framevault::receiver::Receiver;
use std::io::Read;

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
        "Usage:\n  {} --input <packets> --output <file> [--password <pwd>]",
        program
    );
}

fn main() {
    std::env::set_var("RUST_LOG", "info");
    env_logger::builder().is_test(true).try_init().ok();

    let args: Vec<String> = std::env::args().collect();
    let mut input_path = String::new();
    let mut output_path = String::new();
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

    let data = match std::fs::read(&input_path) {
        Ok(data) => data,
        Err(_) => {
            eprintln!("Error: input not found: {}", input_path);
            std::process::exit(1);
        }
    };
    println!("Input: {} ({})", input_path, format_size(data.len() as u64));

    let mut receiver = Receiver::new();
    let mut cursor = &data[..];
    loop {
        let mut len_bytes = [0u8; 4];
        if cursor.read_exact(&mut len_bytes).is_err() {
            break;
        }
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > cursor.len() {
            break;
        }
        receiver.push(&cursor[..len]);
        cursor = &cursor[len..];
    }

    println!("Packets extracted: {}", receiver.nb_pkt_received());
    if receiver.nb_pkt_accepted() == 0 {
        eprintln!("No packets could be extracted from the input");
        std::process::exit(1);
    }

    let expected = match receiver.expected_chunks() {
        Some(expected) => expected,
        None => {
            eprintln!("No packets could be extracted from the input");
            std::process::exit(1);
        }
    };
    println!(
        "Chunks decoded: {}/{}",
        receiver.nb_chunks_completed(),
        expected
    );

    if receiver.is_encrypted() {
        if password.is_empty() {
            eprintln!("Error: content is encrypted, password required (use --password)");
            std::process::exit(1);
        }
        if let Err(e) = receiver.set_password(&password) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let assembled = match receiver.assemble(expected) {
        Ok(assembled) => assembled,
        Err(e) => {
            receiver.clear_decrypt_key();
            eprintln!("Error: failed to assemble file ({})", e);
            std::process::exit(1);
        }
    };
    receiver.clear_decrypt_key();

    if let Err(e) = std::fs::write(&output_path, &assembled) {
        eprintln!("Error: could not write {}: {}", output_path, e);
        std::process::exit(1);
    }

    println!(
        "\nDecode complete: {} -> {}",
        format_size(data.len() as u64),
        format_size(assembled.len() as u64)
    );
    println!("Written to: {}", output_path);
}
