use std::env;
use std::fs;

use nesasm::assembler::{self, Assembler};
use nesasm::logging;

struct Options {
    input: Option<String>,
    output: String,
    prg_rom_size: Option<u8>,
    chr_rom_size: Option<u8>,
}

fn parse_size(arg: &str) -> Option<u8> {
    if let Some(hex) = arg.strip_prefix('$') {
        u8::from_str_radix(hex, 16).ok()
    } else {
        arg.parse::<u8>().ok()
    }
}

fn print_help(program: &str) {
    println!("Usage: {} [options] -f file", program);
    println!("  (-o|-object) file     write the assembled ROM here (default a.out)");
    println!("  (-f|-file) file       the source file to assemble");
    println!("  -prom n               override the PRG-ROM bank count");
    println!("  -crom n               override the CHR-ROM bank count");
    println!("  -pram, -incbin        accepted, currently no-ops");
    println!("  --version             print the version and exit");
}

fn parse_args(args: &[String]) -> Result<Options, i32> {
    let program = &args[0];
    let mut input = None;
    let mut output = None;
    let mut prg_rom_size = None;
    let mut chr_rom_size = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" => {
                print_help(program);
                return Err(0xFF);
            }
            "--version" => {
                println!("nesasm 0.1");
                return Err(0xFF);
            }
            "-f" | "-file" => {
                i += 1;
                input = args.get(i).cloned();
                if input.is_none() {
                    logging::error("expected argument");
                    return Err(0xFF);
                }
            }
            "-o" | "-object" => {
                i += 1;
                output = args.get(i).cloned();
                if output.is_none() {
                    logging::error("expected argument");
                    return Err(0xFF);
                }
            }
            "-prom" => {
                i += 1;
                match args.get(i).and_then(|a| parse_size(a)) {
                    Some(v) => prg_rom_size = Some(v),
                    None => {
                        logging::error("expected a valid PRG-ROM size");
                        return Err(0xFF);
                    }
                }
            }
            "-crom" => {
                i += 1;
                match args.get(i).and_then(|a| parse_size(a)) {
                    Some(v) => chr_rom_size = Some(v),
                    None => {
                        logging::error("expected a valid CHR-ROM size");
                        return Err(0xFF);
                    }
                }
            }
            "-pram" | "-incbin" => {}
            other => {
                logging::error(format!("usage --help for options and not {}", other));
                return Err(0xFF);
            }
        }
        i += 1;
    }

    if input.is_none() {
        logging::error("no input files");
        return Err(0xFF);
    }

    Ok(Options { input, output: output.unwrap_or_else(|| "a.out".to_string()), prg_rom_size, chr_rom_size })
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(code) => std::process::exit(code),
    };

    let path = options.input.unwrap();
    let source = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => {
            logging::error(format!("no such file or directory {}", path));
            std::process::exit(0xFF);
        }
    };

    let mut asm = Assembler::new(path, source);
    if let Some(prg_rom_size) = options.prg_rom_size {
        asm.header.prg_rom_size = prg_rom_size;
    }
    if let Some(chr_rom_size) = options.chr_rom_size {
        asm.header.chr_rom_size = chr_rom_size;
    }

    let assembler::Assembly { rom, diagnostics } = asm.finish();

    match rom {
        Some(rom) => {
            if let Err(e) = fs::write(&options.output, rom) {
                logging::error(format!("failed to write to output file: {}", e));
                std::process::exit(0xFF);
            }
        }
        None => {
            logging::error(if diagnostics.error_count() <= 1 { "An error has occurred" } else { "Multiple errors has occurred" });
            std::process::exit(0xFF);
        }
    }
}
