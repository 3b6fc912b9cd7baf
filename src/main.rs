use anyhow::Result;

fn main() -> Result<()> {
    dl_cli::run()
}
