fn main() -> anyhow::Result<()> {
    archive_tui::cli::run()
}
