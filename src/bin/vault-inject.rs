fn main() -> color_eyre::eyre::Result<()> {
    vault_inject::cli::main()
}
