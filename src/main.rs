use clap::{arg, crate_version, value_parser, Command};
use cw_bwt::{to_file, AllocationPolicy, ContextLength, CwBwtBuilder, FileBackwardReader, Options};
use std::path::PathBuf;

const RCH: &str = "unreachable was reached";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help =
"Examples:
---------
Auto context length:  `cw-bwt my_text.txt my_text.bwt`
Explicit k=3:         `cw-bwt my_text.txt my_text.bwt 3 --verbose`";

    let allocations = ["eager", "on-demand"];

    let matches = Command::new("cw-bwt")
        .about("Build the Burrows-Wheeler Transform of a file in compressed working memory")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(<text_file> "input text file").value_parser(value_parser!(PathBuf)))
        .arg(arg!(<bwt_file> "output BWT file").value_parser(value_parser!(PathBuf)))
        .arg(arg!([k] "explicit context length (default: chosen automatically)").value_parser(value_parser!(u32)))
        .arg(arg!(--allocation <POLICY> "node/leaf allocation policy for the dynamic bitvector")
            .value_parser(allocations)
            .default_value("on-demand"))
        .arg(arg!(--verbose "print progress and statistics to stdout"))
        .arg(arg!(--"strip-trailing-newline" "drop one trailing newline byte before reading backward"))
        .get_matches();

    let text_file = matches.get_one::<PathBuf>("text_file").expect(RCH);
    let bwt_file = matches.get_one::<PathBuf>("bwt_file").expect(RCH);
    let verbose = matches.get_flag("verbose");

    let options = Options {
        k: match matches.get_one::<u32>("k") {
            Some(&k) => ContextLength::Explicit(k),
            None => ContextLength::Auto,
        },
        allocation: match matches.get_one::<String>("allocation").map(String::as_str) {
            Some("eager") => AllocationPolicy::Eager,
            _ => AllocationPolicy::OnDemand,
        },
        verbose,
        strip_trailing_newline: matches.get_flag("strip-trailing-newline"),
    };

    if verbose {
        println!("reading {} backward...", text_file.display());
    }

    let reader = FileBackwardReader::open(text_file, options.strip_trailing_newline)?;
    let builder = CwBwtBuilder::build(reader, &options)?;

    if verbose {
        let stats = builder.stats();
        println!("alphabet size: {}", stats.alphabet_size);
        println!("context length k: {}", stats.context_length);
        println!("number of contexts: {}", stats.num_contexts);
        println!("largest context length: {}", stats.largest_context_len);
        println!(
            "expected uniform context length: {:.2}",
            stats.expected_uniform_context_len
        );
        println!(
            "empirical entropy: {:.3} bits/symbol",
            stats.empirical_entropy_bits_per_symbol
        );
        println!(
            "actual entropy: {:.3} bits/symbol",
            stats.actual_entropy_bits_per_symbol
        );
    }

    let written = to_file(builder.into_iterator(), bwt_file)?;
    if verbose {
        println!("wrote {written} bytes to {}", bwt_file.display());
    }

    Ok(())
}
