//! Version command implementation.

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = "netpol-compat";

pub fn run() {
    println!("{NAME} {VERSION}");
    println!();
    println!("Checks NetworkPolicy rollouts for traffic they would break.");
    println!();
    println!("Build info:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
}
