fn main() -> anyhow::Result<()> {
    lazyitems::cli::run()
}
