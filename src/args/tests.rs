use std::time::Duration;

use clap::Parser;

use super::parsers::{parse_duration_arg, parse_property};
use super::*;
use crate::error::{AppError, AppResult, ValidationError};

fn parse_test_args<I, T>(args: I) -> AppResult<DriverArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    DriverArgs::try_parse_from(args).map_err(AppError::from)
}

#[test]
fn parse_args_defaults() -> AppResult<()> {
    let args = parse_test_args(["benchdriver", "--scenario", "plaintext"])?;

    let checks = [
        (args.scenario == "plaintext", "Unexpected scenario"),
        (args.iterations.get() == 1, "Expected one iteration"),
        (args.exclude == 0, "Expected no exclusion"),
        (args.span.is_none(), "Expected no span"),
        (args.output.is_none(), "Expected no output"),
        (args.properties.is_empty(), "Expected no properties"),
        (!args.exclude_metadata, "Expected metadata to be kept"),
        (!args.exclude_measurements, "Expected measurements to be kept"),
        (!args.verbose, "Expected verbose to be false"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(AppError::config(message));
        }
    }
    Ok(())
}

#[test]
fn parse_args_full() -> AppResult<()> {
    let args = parse_test_args([
        "benchdriver",
        "-c",
        "bench.json",
        "-s",
        "json",
        "-i",
        "5",
        "--exclude",
        "1",
        "--span",
        "2m",
        "-o",
        "out/results.json",
        "-p",
        "branch=main",
        "--property",
        "query=a=b",
        "--session",
        "nightly",
        "--exclude-metadata",
        "--exclude-measurements",
        "-v",
    ])?;

    if args.config.as_deref() != Some("bench.json") || args.iterations.get() != 5 {
        return Err(AppError::config("Unexpected config or iterations"));
    }
    if args.span != Some(Duration::from_secs(120)) {
        return Err(AppError::config(format!("Unexpected span {:?}", args.span)));
    }
    let properties = args.property_map("nightly");
    let expected = [
        ("branch", "main"),
        ("query", "a=b"),
        ("session", "nightly"),
    ];
    let matches = properties.len() == expected.len()
        && expected
            .iter()
            .all(|(key, value)| properties.get(*key).map(String::as_str) == Some(*value));
    if !matches {
        return Err(AppError::config(format!("Unexpected properties {:?}", properties)));
    }
    if !args.exclude_metadata || !args.exclude_measurements || !args.verbose {
        return Err(AppError::config("Expected flags to be set"));
    }
    Ok(())
}

#[test]
fn scenario_is_required() -> AppResult<()> {
    if parse_test_args(["benchdriver"]).is_ok() {
        return Err(AppError::config("Expected missing scenario to fail"));
    }
    Ok(())
}

#[test]
fn zero_iterations_are_rejected() -> AppResult<()> {
    if parse_test_args(["benchdriver", "-s", "a", "-i", "0"]).is_ok() {
        return Err(AppError::config("Expected zero iterations to fail"));
    }
    Ok(())
}

#[test]
fn parse_duration_units() -> AppResult<()> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("30", Duration::from_secs(30)),
        ("30s", Duration::from_secs(30)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_arg(input)?;
        if parsed != expected {
            return Err(AppError::config(format!(
                "'{}' parsed as {:?}",
                input, parsed
            )));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_errors() -> AppResult<()> {
    let checks: [(&str, fn(&ValidationError) -> bool); 5] = [
        ("", |err| matches!(err, ValidationError::DurationEmpty)),
        ("ms", |err| matches!(err, ValidationError::InvalidDurationFormat { .. })),
        ("5d", |err| matches!(err, ValidationError::InvalidDurationUnit { .. })),
        ("0s", |err| matches!(err, ValidationError::DurationZero)),
        ("99999999999999999999h", |err| {
            matches!(err, ValidationError::InvalidDurationNumber { .. })
        }),
    ];
    for (input, expected) in checks {
        match parse_duration_arg(input) {
            Err(AppError::Validation(err)) if expected(&err) => {}
            other => {
                return Err(AppError::config(format!(
                    "'{}' gave {:?}",
                    input, other
                )));
            }
        }
    }
    if !matches!(
        parse_duration_arg("5124095576030432h"),
        Err(AppError::Validation(ValidationError::DurationOverflow))
    ) {
        return Err(AppError::config("Expected overflow"));
    }
    Ok(())
}

#[test]
fn parse_property_requires_key() -> AppResult<()> {
    if parse_property("=value").is_ok() || parse_property("novalue").is_ok() {
        return Err(AppError::config("Expected invalid properties to fail"));
    }
    let (key, value) = parse_property(" os = linux ")?;
    if key != "os" || value != "linux" {
        return Err(AppError::config(format!("Unexpected pair {}={}", key, value)));
    }
    Ok(())
}
