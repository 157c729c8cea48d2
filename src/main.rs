fn main() -> anyhow::Result<()> {
    imgseek::cli::run()
}
