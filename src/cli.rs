//! Command-line options for the `minnow` binary.

use std::path::PathBuf;

use thiserror::Error;

/// Output path used when `-o` is not given.
pub const DEFAULT_OUTPUT: &str = "out.s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub verbose: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("missing source file")]
    MissingInput,
    #[error("option {0} requires a value")]
    MissingValue(String),
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("unexpected argument {0}")]
    ExtraArgument(String),
}

impl CliOptions {
    /// Parse arguments, not including the program name.
    pub fn parse<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input = None;
        let mut output = None;
        let mut verbose = false;

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-o" => {
                    let value = args.next().ok_or_else(|| UsageError::MissingValue(arg.clone()))?;
                    output = Some(PathBuf::from(value));
                }
                "-v" => verbose = true,
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(UsageError::UnknownOption(flag.to_string()));
                }
                _ if input.is_none() => input = Some(PathBuf::from(&arg)),
                other => return Err(UsageError::ExtraArgument(other.to_string())),
            }
        }

        Ok(CliOptions {
            input: input.ok_or(UsageError::MissingInput)?,
            output: output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            verbose,
        })
    }
}

pub fn usage(program: &str) -> String {
    format!("Usage: {program} [-o <output>] [-v] <source>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_output_path() {
        let opts = CliOptions::parse(["prog.mn"]).unwrap();
        assert_eq!(opts.input, PathBuf::from("prog.mn"));
        assert_eq!(opts.output, PathBuf::from("out.s"));
        assert!(!opts.verbose);
    }

    #[test]
    fn accepts_flags_in_any_position() {
        let opts = CliOptions::parse(["-v", "prog.mn", "-o", "build/prog.s"]).unwrap();
        assert_eq!(opts.output, PathBuf::from("build/prog.s"));
        assert!(opts.verbose);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(CliOptions::parse(Vec::<String>::new()), Err(UsageError::MissingInput));
        assert_eq!(
            CliOptions::parse(["prog.mn", "-o"]),
            Err(UsageError::MissingValue("-o".into()))
        );
        assert_eq!(
            CliOptions::parse(["--emit", "prog.mn"]),
            Err(UsageError::UnknownOption("--emit".into()))
        );
        assert_eq!(
            CliOptions::parse(["a.mn", "b.mn"]),
            Err(UsageError::ExtraArgument("b.mn".into()))
        );
    }
}
