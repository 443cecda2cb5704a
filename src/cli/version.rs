/// Display version information
pub fn execute() {
    println!("escrowgate {}", env!("CARGO_PKG_VERSION"));
    println!("Multi-party approval service for treasury escrow releases");
}
