use crate::cli::LadderArgs;
use crate::error::Result;
use rexmc::engine::exchange::ladder::{LadderSpacing, create_ladder};
use std::io::Write;
use tracing::info;

pub fn run(args: LadderArgs) -> Result<()> {
    let spacing = LadderSpacing::from(args.spacing);
    info!(
        replicas = args.replicas,
        %spacing,
        "Building temperature ladder."
    );
    let ladder = create_ladder(
        args.min_temperature,
        args.max_temperature,
        args.replicas,
        spacing,
    )?;

    let stdout = std::io::stdout();
    write_ladder(&mut stdout.lock(), &ladder)
}

fn write_ladder<W: Write>(out: &mut W, ladder: &[f64]) -> Result<()> {
    writeln!(out, "rung\ttemperature")?;
    for (rung, t) in ladder.iter().enumerate() {
        writeln!(out, "{}\t{:.6}", rung, t)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliSpacing;
    use crate::error::CliError;

    #[test]
    fn ladder_is_printed_one_rung_per_line() {
        let ladder = create_ladder(1.0, 4.0, 3, LadderSpacing::Geometric).unwrap();
        let mut out = Vec::new();
        write_ladder(&mut out, &ladder).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "rung\ttemperature\n0\t1.000000\n1\t2.000000\n2\t4.000000\n"
        );
    }

    #[test]
    fn inverted_bounds_are_a_configuration_error() {
        let args = LadderArgs {
            min_temperature: 2.0,
            max_temperature: 1.0,
            replicas: 4,
            spacing: CliSpacing::Linear,
        };
        assert!(matches!(run(args), Err(CliError::Config(_))));
    }
}
