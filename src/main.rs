use clap::Parser;

use param3d1d::{
    BuildOptions, Discretization, JsonParamStore, LumpedIntegrator, Param3d1d, ParamError,
    TissueGrid, VesselNetwork,
};

/// Builds the dimensionless parameters of a coupled 3D/1D flow model
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Json parameter file
    input: String,

    /// Vessel network geometry (.csv or .vtu)
    network: String,

    /// Tissue grid subdivisions per axis
    #[arg(short, long, default_value_t = 10)]
    subdivisions: usize,

    /// Tissue box edge lengths
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [1.0, 1.0, 1.0])]
    tissue_size: Vec<f64>,

    /// Report every build stage
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<(), ParamError> {
    let store = JsonParamStore::from_file(&args.input)?;
    let network = VesselNetwork::load(&args.network)?;
    let size = match args.tissue_size.as_slice() {
        [x, y, z] => [*x, *y, *z],
        _ => {
            return Err(ParamError::Input(
                "tissue size needs exactly three values".to_owned(),
            ))
        }
    };
    let tissue = TissueGrid::new(args.subdivisions, size)?;

    let options = BuildOptions {
        verbose: args.verbose,
    };
    let param = Param3d1d::build(&store, &tissue, &network, &options)?;

    print!("{param}");
    for branch in 0..network.nb_regions() {
        println!(
            "  branch {branch:>4} : R' = {}",
            param.radius_on_region(&LumpedIntegrator, branch)?
        );
    }
    for advisory in param.advisories() {
        println!("warning: {advisory}");
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(&args) {
        log::error!("{err}");
        // 2: bad parameter file, 1: anything else
        std::process::exit(if err.is_configuration() { 2 } else { 1 })
    }
}
