mod config;
mod error;
mod generator;
mod ledger;
mod logging;
mod pile;
mod probe;
mod robot;
mod sim;
mod stations;
mod turns;
mod types;

use config::SimConfig;
use error::ConfigError;

fn parse_usize_list(arg: &str) -> Option<Vec<usize>> {
    if arg == "-" {
        return None;
    }
    let mut values = Vec::new();
    for part in arg.split(',') {
        if part.trim().is_empty() {
            return None;
        }
        let value = part.trim().parse::<usize>().ok()?;
        values.push(value);
    }
    Some(values)
}

fn print_usage(program: &str) {
    println!("Warehouse simulator");
    println!("Usage:");
    println!("  {program} [--seed N | --seed-file PATH]   (run the reference warehouse)");
    println!("  {program} bench [teams] [robots_per_team] [packages] [work_us] [seed]");
    println!("  {program} stress [team_sets] [robot_sets] [package_sets] [work_us]");
    println!("  {program} --help");
    println!();
    println!(
        "The seed is read from {} unless given on the command line.",
        config::DEFAULT_SEED_FILE
    );
    println!("Sets are comma-separated lists (e.g., 1,2,4). Use \"-\" to keep a default set.");
    println!("Defaults:");
    println!("  run    teams=4 robots_per_team=10 packages=80 holds=1000..10000us");
    println!("  bench  teams=4 robots_per_team=10 packages=80 work_us=500 seed=1");
    println!("  stress teams=1,2,4 robots_per_team=1,2,10 packages=0,20,80 work_us=500");
    println!("Set RUST_LOG=debug for per-step narration.");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn exit_with_error(err: ConfigError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}

fn parse_arg<T: std::str::FromStr>(
    program: &str,
    command: &str,
    name: &str,
    arg: Option<String>,
) -> Option<T> {
    let arg = arg?;
    match arg.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => exit_with_usage(program, &format!("{command}: invalid {name} value: {arg}")),
    }
}

fn run_command(program: &str, args: Vec<String>) -> Result<(), ConfigError> {
    let mut seed: Option<u64> = None;
    let mut seed_file = config::DEFAULT_SEED_FILE.to_string();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let raw = args
                    .next()
                    .unwrap_or_else(|| exit_with_usage(program, "--seed needs a value"));
                match config::parse_seed(&raw) {
                    Some(value) => seed = Some(value),
                    None => exit_with_usage(program, &format!("invalid seed: {raw}")),
                }
            }
            "--seed-file" => {
                seed_file = args
                    .next()
                    .unwrap_or_else(|| exit_with_usage(program, "--seed-file needs a path"));
            }
            other => exit_with_usage(program, &format!("unknown argument: {other}")),
        }
    }
    let seed = match seed {
        Some(seed) => seed,
        None => config::load_seed(&seed_file)?,
    };
    log::info!("[SEED] random seed is {seed}");
    sim::run_demo(&SimConfig::with_seed(seed))
}

fn stress_command(program: &str, args: impl Iterator<Item = String>) -> Result<(), ConfigError> {
    let mut sets: [Option<Vec<usize>>; 3] = [None, None, None];
    let names = ["team_sets", "robot_sets", "package_sets"];
    let mut work_us: Option<u64> = None;
    let mut position = 0;
    for arg in args {
        if position < sets.len() {
            if arg != "-" {
                match parse_usize_list(&arg) {
                    Some(values) => sets[position] = Some(values),
                    None => exit_with_usage(
                        program,
                        &format!("stress: invalid {} value: {arg}", names[position]),
                    ),
                }
            }
        } else if position == sets.len() {
            work_us = parse_arg(program, "stress", "work_us", Some(arg));
        } else {
            exit_with_usage(program, &format!("stress: unexpected argument: {arg}"));
        }
        position += 1;
    }
    let [team_sets, robot_sets, package_sets] = sets;
    sim::run_stress(team_sets, robot_sets, package_sets, work_us)
}

fn main() {
    logging::init();
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "warehouse_sim".to_string());
    let mut args = std::env::args().skip(1);
    let result = match args.next().as_deref() {
        Some("bench") => {
            let teams = parse_arg(&program, "bench", "teams", args.next());
            let robots_per_team = parse_arg(&program, "bench", "robots_per_team", args.next());
            let packages = parse_arg(&program, "bench", "packages", args.next());
            let work_us = parse_arg(&program, "bench", "work_us", args.next());
            let seed = parse_arg(&program, "bench", "seed", args.next());
            if let Some(extra) = args.next() {
                exit_with_usage(&program, &format!("bench: unexpected argument: {extra}"));
            }
            sim::run_benchmark(teams, robots_per_team, packages, work_us, seed)
        }
        Some("stress") => stress_command(&program, args),
        Some("--help") | Some("-h") | Some("help") => {
            print_usage(&program);
            Ok(())
        }
        Some(first) => {
            let rest = std::iter::once(first.to_string()).chain(args).collect();
            run_command(&program, rest)
        }
        None => run_command(&program, Vec::new()),
    };
    if let Err(err) = result {
        exit_with_error(err);
    }
}
