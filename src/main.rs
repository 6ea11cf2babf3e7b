mod app;
mod domain;
mod ui;
mod util;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::{
    app::Session,
    domain::{
        cg_travel, formula, FuelPlan, Margin, PlotArea, ProfileError, SaveOutcome, ScreenPoint,
        StationIndex, UnitSystem, ViewMode,
    },
    ui::components::{envelope_chart, fuel_table, profile_list, station_table, summary},
    util::{
        assets,
        persistence::JsonStore,
        version::{version_label, APP_NAME},
    },
};

#[derive(Parser, Debug)]
#[command(name = "weight-balance")]
#[command(author = util::version::APP_AUTHOR)]
#[command(version)]
#[command(about = "Pre-flight weight & balance: %MAC limits, CG envelope and fuel sequencing")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Storage directory (defaults to WB_DATA_DIR, then the platform config dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load a saved aircraft profile before running the command
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Load an aircraft template before running the command
    #[arg(long, global = true, conflicts_with = "profile")]
    template: Option<String>,

    /// Work in kilograms and metres
    #[arg(long, global = true)]
    metric: bool,

    /// %MAC formula in the variable CG (inches)
    #[arg(long, global = true)]
    formula: Option<String>,

    #[arg(long, global = true, allow_negative_numbers = true)]
    mac_min: Option<f64>,

    #[arg(long, global = true, allow_negative_numbers = true)]
    mac_max: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the loading schedule and condition summary
    Show,
    /// Set a station weight
    Set {
        station: StationIndex,
        #[arg(allow_negative_numbers = true)]
        weight: f64,
    },
    /// Set a station arm
    Arm {
        station: StationIndex,
        #[arg(allow_negative_numbers = true)]
        arm: f64,
    },
    /// Zero every station weight
    Clear,
    /// Delete the stored weights
    Forget,
    /// Rename one of the custom stations (8, 9, 10)
    Rename { station: StationIndex, name: String },
    /// Restore the default custom station names
    ResetNames,
    #[command(subcommand)]
    Formula(FormulaCommand),
    /// Draw the CG envelope
    Envelope {
        #[arg(long, default_value = "cg")]
        mode: ViewMode,
        #[arg(long, default_value_t = 600.0)]
        width: f64,
        #[arg(long, default_value_t = 400.0)]
        height: f64,
        /// Hide the ZFW → TOW → LDW path
        #[arg(long)]
        no_path: bool,
        /// Report the point under these canvas coordinates
        #[arg(long, num_args = 2, value_names = ["X", "Y"])]
        probe: Option<Vec<f64>>,
        /// Keep this calculation in the session history under a name
        #[arg(long)]
        record: Option<String>,
    },
    /// Simulate fuel consumption through the tanks in priority order
    Fuel {
        /// Flight time in hours
        #[arg(long)]
        time: f64,
        /// Burn rate per hour
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = 0.0)]
        reserve: f64,
        /// Tank station numbers in consumption order, e.g. 12,11
        #[arg(long, value_delimiter = ',')]
        order: Vec<StationIndex>,
        /// Go back to station order before applying --order
        #[arg(long)]
        reset_order: bool,
        /// Set the landing fuel to the reserve
        #[arg(long)]
        apply: bool,
    },
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Template(TemplateCommand),
}

/// %MAC formula tools
#[derive(Subcommand, Debug)]
enum FormulaCommand {
    /// Evaluate a formula without adopting it
    Test {
        expr: String,
        #[arg(long, default_value_t = formula::FORMULA_TEST_CG)]
        cg: f64,
    },
    /// Restore the default formula and limits
    Reset,
}

/// Saved aircraft profiles
#[derive(Subcommand, Debug)]
enum ProfileCommand {
    Save {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Replace an existing profile with the same name
        #[arg(long)]
        overwrite: bool,
    },
    Load { name: String },
    List,
    Delete { name: String },
    Duplicate {
        name: String,
        #[arg(long = "as")]
        new_name: Option<String>,
    },
}

/// Built-in aircraft templates
#[derive(Subcommand, Debug)]
enum TemplateCommand {
    List,
    Load { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!("{APP_NAME} {}", version_label());

    let store = match &cli.data_dir {
        Some(dir) => JsonStore::with_root(dir),
        None => JsonStore::open_default().context("no storage directory available")?,
    };
    info!("using storage at {}", store.root().display());
    let mut session = Session::open(store);

    apply_globals(&mut session, &cli)?;
    run(&mut session, cli.command.unwrap_or(Command::Show))?;

    if let Some(report) = session.flush().await {
        info!("limits advisory: {} issue(s)", report.issues.len());
    }
    for toast in session.toasts.drain() {
        println!("{toast}");
    }
    Ok(())
}

fn apply_globals(session: &mut Session, cli: &Cli) -> Result<()> {
    if let Some(key) = &cli.template {
        session
            .load_template(key)
            .with_context(|| format!("loading template {key}"))?;
    }
    if let Some(name) = &cli.profile {
        session
            .load_profile(name)
            .with_context(|| format!("loading profile {name}"))?;
    }
    if cli.metric {
        session.set_unit(UnitSystem::Metric);
    }
    if let Some(text) = &cli.formula {
        let value = session.apply_formula(text).context("rejected --formula")?;
        println!("Formula OK: {value:.2}% MAC at CG {}", formula::FORMULA_TEST_CG);
    }
    if cli.mac_min.is_some() || cli.mac_max.is_some() {
        let min = cli.mac_min.unwrap_or(session.state.mac.mac_min);
        let max = cli.mac_max.unwrap_or(session.state.mac.mac_max);
        session.set_mac_limits(min, max)?;
    }
    Ok(())
}

fn run(session: &mut Session, command: Command) -> Result<()> {
    match command {
        Command::Show => show(session),
        Command::Set { station, weight } => {
            session.set_weight(station, weight)?;
            show(session);
        }
        Command::Arm { station, arm } => {
            session.set_arm(station, arm)?;
            show(session);
        }
        Command::Clear => {
            session.clear_weights();
            show(session);
        }
        Command::Forget => session.forget_saved_weights(),
        Command::Rename { station, name } => session.rename_station(station, &name)?,
        Command::ResetNames => session.reset_station_names(),
        Command::Formula(FormulaCommand::Test { expr, cg }) => {
            let value = formula::validate(&expr)
                .and_then(|f| f.evaluate(cg))
                .with_context(|| format!("testing {expr:?}"))?;
            println!("CG {cg} → {value:.2}% MAC");
        }
        Command::Formula(FormulaCommand::Reset) => {
            session.reset_mac_defaults();
            println!("%MAC configuration reset to defaults");
        }
        Command::Envelope {
            mode,
            width,
            height,
            no_path,
            probe,
            record,
        } => envelope(session, mode, width, height, !no_path, probe, record)?,
        Command::Fuel {
            time,
            rate,
            reserve,
            order,
            reset_order,
            apply,
        } => {
            let plan = FuelPlan::new(time, rate, reserve)?;
            fuel(session, &plan, &order, reset_order, apply)?
        }
        Command::Profile(command) => profile(session, command)?,
        Command::Template(TemplateCommand::List) => {
            let templates = assets::all_templates()?;
            print!("{}", profile_list::render_templates(&templates));
        }
        Command::Template(TemplateCommand::Load { key }) => {
            session.load_template(&key)?;
            show(session);
        }
    }
    Ok(())
}

fn show(session: &Session) {
    let state = &session.state;
    if let Some(source) = &state.loaded_from {
        println!("Aircraft: {source}");
    }
    print!(
        "{}",
        station_table::render(&state.stations, &state.totals(), state.unit)
    );
    println!();
    let conditions = state.conditions();
    print!("{}", summary::render_conditions(&conditions, &state.mac, state.unit));
    if conditions.tow.is_present() && conditions.ldw.is_present() {
        println!(
            "{}",
            summary::render_cg_travel(&cg_travel(&conditions.tow, &conditions.ldw), state.unit)
        );
    }
    if let Some(text) = summary::render_report(&state.limit_report()) {
        println!("{text}");
    }
}

fn envelope(
    session: &mut Session,
    mode: ViewMode,
    width: f64,
    height: f64,
    show_path: bool,
    probe: Option<Vec<f64>>,
    record: Option<String>,
) -> Result<()> {
    let margin = Margin::default();
    if width <= margin.left + margin.right || height <= margin.top + margin.bottom {
        bail!("canvas {width}x{height} is too small for the chart margins");
    }
    let area = PlotArea::from_canvas(width, height, margin);
    session.state.view_mode = mode;
    session.state.show_flight_path = show_path;

    let scene = session.state.envelope(area);
    print!("{}", envelope_chart::render(&scene, session.state.unit));

    if let Some([x, y]) = probe.as_deref() {
        let pos = ScreenPoint::new(*x, *y);
        match scene.hit_test(pos) {
            Some(point) => println!(
                "Hit: {}",
                envelope_chart::point_details(point, session.state.unit)
            ),
            None => {
                let (dx, dy) = scene.projection.to_data(pos);
                println!("No point at ({x}, {y}); chart position {dx:.2}, {dy:.1}");
            }
        }
    }

    if let Some(name) = record {
        session
            .state
            .save_calculation(&name, area, time::OffsetDateTime::now_utc());
        print!("{}", profile_list::render_history(&session.state.history));
    }
    Ok(())
}

fn fuel(
    session: &mut Session,
    plan: &FuelPlan,
    order: &[StationIndex],
    reset_order: bool,
    apply: bool,
) -> Result<()> {
    if reset_order {
        session.reset_fuel_priorities();
    }
    session.state.refresh_fuel_priorities();
    for (pos, &index) in order.iter().enumerate() {
        let Some(current) = session.state.fuel_priorities.get(pos).map(|p| p.station_index) else {
            bail!("more tanks in --order than fuel stations");
        };
        if current != index && !session.move_fuel_priority(index, current) {
            bail!("station {index} is not a fuel tank");
        }
    }
    print!(
        "{}",
        fuel_table::render_priorities(&session.state.fuel_priorities, &session.state.stations)
    );

    let sequence = session.plan_fuel(plan, apply)?;
    print!("{}", fuel_table::render_sequence(&sequence, session.state.unit));

    let conditions = session.state.conditions();
    if conditions.tow.is_present() && conditions.ldw.is_present() {
        println!(
            "{}",
            summary::render_cg_travel(
                &cg_travel(&conditions.tow, &conditions.ldw),
                session.state.unit
            )
        );
    }
    Ok(())
}

fn profile(session: &mut Session, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Save {
            name,
            description,
            overwrite,
        } => {
            let outcome = match session.save_profile(&name, &description, overwrite) {
                Err(ProfileError::AlreadyExists(name)) => {
                    bail!("profile {name} already exists; pass --overwrite to replace it")
                }
                other => other?,
            };
            if outcome == SaveOutcome::Overwritten {
                println!("Replaced existing profile {name}");
            }
        }
        ProfileCommand::Load { name } => {
            session.load_profile(&name)?;
            show(session);
        }
        ProfileCommand::List => {
            print!("{}", profile_list::render_profiles(session.profiles.iter()))
        }
        ProfileCommand::Delete { name } => {
            session.delete_profile(&name)?;
            println!("Deleted profile {name}");
        }
        ProfileCommand::Duplicate { name, new_name } => {
            let copy = session.duplicate_profile(&name, new_name.as_deref())?;
            println!("Duplicated {name} as {copy}");
        }
    }
    Ok(())
}
