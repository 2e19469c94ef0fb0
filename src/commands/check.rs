use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Run a single collection cycle and report it
///
/// Exits with status 1 when any app could not be checked.
pub async fn check<H: Host>(host: &mut H, args: &CheckArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let results = common.scheduler.run_once().await;
    common.report(host, &results)?;

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        let _ = writeln!(host.error(), "❌ {failed} of {} app(s) could not be checked", results.len());
        host.exit(1);
    }

    Ok(())
}
