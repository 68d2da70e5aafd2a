fn main() -> anyhow::Result<()> {
    torchmesh::cli::run_cli()
}
