fn main() -> anyhow::Result<()> {
    jisc_lrs::run()?;
    Ok(())
}
