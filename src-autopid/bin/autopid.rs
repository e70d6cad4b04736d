//! AutoPID - Tune PID gains on a simulated distance-keeping cart
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use autopid::cli::{self, Args};
use autopid::optim::{DirStore, Optimizer};
use autopid::{SimulatedPlant, run_tuning};
use autopid_env::resolve_data_dir;
use clap::Parser;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    autopid::init_logging();
    let args = Args::parse();
    cli::validate_args_or_exit(&args);

    let data_dir = resolve_data_dir(args.data_dir.as_deref())?;
    log::info!("data directory: {}", data_dir.display());
    let store = DirStore::new(&data_dir)?;

    let mut opt = Optimizer::new(args.algorithm, args.tuner_config(), store)?;
    if args.reset {
        opt.reset_persisted_data()?;
    }

    let mut plant = SimulatedPlant::new(args.start_distance, args.seed);
    let settings = args.trial_settings();
    match run_tuning(&mut opt, &mut plant, &settings, args.max_trials)? {
        Some((best, cost)) => {
            println!("{} best gains (Kp, Ki, Kd): {best}", args.algorithm);
            println!("{} cost: {cost:.4}", args.cost);
        }
        None => println!("no trial evaluated yet"),
    }
    if !opt.is_done() {
        println!(
            "stopped at generation {}, member {}; run again to resume",
            opt.generation(),
            opt.member()
        );
    }
    Ok(())
}
