use std::path::PathBuf;

#[derive(Debug)]
struct CliArgs {
    silent: bool,
    players: usize,
    paths: Vec<PathBuf>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            silent: false,
            players: 1,
            paths: Vec::new(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    vidwall::app::run_with_startup(vidwall::app::AppStartupOptions {
        silent: args.silent,
        players: args.players,
        paths: args.paths,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--silent" => out.silent = true,
            "--players" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--players requires a count");
                };
                let count: usize = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--players expects a number, got {value}"))?;
                if !(1..=vidwall::model::MAX_PLAYERS).contains(&count) {
                    anyhow::bail!(
                        "--players must be between 1 and {}",
                        vidwall::model::MAX_PLAYERS
                    );
                }
                out.players = count;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with("--") => anyhow::bail!("unknown argument {other}"),
            path => out.paths.push(PathBuf::from(path)),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("VidWall");
    println!("  vidwall [--silent] [--players N] [PATH ...]");
    println!("  --silent          Use the silent clock instead of audio output");
    println!("  --players N       Open N players (1-9)");
    println!("  PATH              Video files or folders for Player 1");
}
