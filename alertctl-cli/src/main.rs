use anyhow::Result;

fn main() -> Result<()> {
    alertctl_cli::cli::execute()
}
