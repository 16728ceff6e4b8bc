//! Builds the spark-submit argument vector from a [`SparkArgs`].
//!
//! The builder always produces discrete tokens, never a pre-quoted shell
//! string, and performs no validation beyond its own field set: unknown
//! options are passed through as-is and left for spark-submit to reject.

use std::path::Path;

use crate::model::spec::{ArgValue, SparkArgs};

/// Ordered argument tokens: options first, then the main file, then its
/// positional arguments.
pub fn build_args(args: &SparkArgs) -> Vec<String> {
    let mut tokens = Vec::new();

    scalar(&mut tokens, "master", &args.master);
    scalar(&mut tokens, "name", &args.name);
    scalar(&mut tokens, "deploy-mode", args.deploy_mode.as_str());
    scalar(&mut tokens, "driver-memory", &args.driver_memory);
    scalar(&mut tokens, "executor-memory", &args.executor_memory);
    scalar(&mut tokens, "executor-cores", &args.executor_cores);
    scalar(&mut tokens, "total-executor-cores", &args.total_executor_cores);
    optional(&mut tokens, "class", args.class.as_deref());
    optional(&mut tokens, "py-files", args.py_files.as_deref());
    optional(&mut tokens, "files", args.files.as_deref());
    optional(&mut tokens, "jars", args.jars.as_deref());
    optional(&mut tokens, "packages", args.packages.as_deref());
    optional(&mut tokens, "exclude-packages", args.exclude_packages.as_deref());
    optional(&mut tokens, "repositories", args.repositories.as_deref());
    optional(&mut tokens, "properties-file", args.properties_file.as_deref());
    flag(&mut tokens, "verbose", args.verbose);
    flag(&mut tokens, "supervise", args.supervise);
    for conf in &args.conf {
        scalar(&mut tokens, "conf", conf);
    }

    for (key, value) in &args.extra {
        let name = key.replace('_', "-");
        match value {
            ArgValue::Flag(set) => flag(&mut tokens, &name, *set),
            ArgValue::Scalar(v) => scalar(&mut tokens, &name, v),
            ArgValue::Repeated(vs) => {
                for v in vs {
                    scalar(&mut tokens, &name, v);
                }
            }
        }
    }

    tokens.push(args.main_file.clone());
    tokens.extend(args.main_file_args.iter().cloned());
    tokens
}

/// Renders the full command line for display. With `multiline`, every flag
/// and the main file start a new backslash-continued line.
pub fn render(program: &Path, args: &SparkArgs, multiline: bool) -> String {
    let tokens = build_args(args);
    let artifact_at = tokens.len() - args.main_file_args.len() - 1;
    let mut out = program.display().to_string();
    for (i, token) in tokens.iter().enumerate() {
        if multiline && (token.starts_with("--") || i == artifact_at) {
            out.push_str(" \\\n");
        } else {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

fn scalar(tokens: &mut Vec<String>, name: &str, value: &str) {
    tokens.push(format!("--{name}"));
    tokens.push(value.to_owned());
}

fn optional(tokens: &mut Vec<String>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        scalar(tokens, name, value);
    }
}

fn flag(tokens: &mut Vec<String>, name: &str, set: bool) {
    if set {
        tokens.push(format!("--{name}"));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::spec::DeployMode;

    fn sample() -> SparkArgs {
        SparkArgs::builder()
            .main_file("resources/pyspark_example.py")
            .total_executor_cores("4")
            .verbose(true)
            .conf(vec!["'foo'='bar'".to_owned()])
            .main_file_args(vec!["conf.json".to_owned()])
            .build()
    }

    #[test]
    fn renders_submit_command() {
        let expected = "/opt/spark/bin/spark-submit --master local[*] \
                        --name spark-submit-task --deploy-mode client \
                        --driver-memory 1g --executor-memory 1g \
                        --executor-cores 1 --total-executor-cores 4 --verbose \
                        --conf 'foo'='bar' resources/pyspark_example.py conf.json";
        let rendered = render(Path::new("/opt/spark/bin/spark-submit"), &sample(), false);
        assert_eq!(rendered, expected);
    }

    #[test]
    fn multiline_breaks_at_flags_and_artifact() {
        let rendered = render(Path::new("spark-submit"), &sample(), true);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "spark-submit \\");
        assert_eq!(lines[1], "--master local[*] \\");
        // the artifact and its positional args share the last line
        assert_eq!(*lines.last().unwrap(), "resources/pyspark_example.py conf.json");
        for line in &lines[..lines.len() - 1] {
            assert!(line.ends_with('\\'), "unterminated line: {line}");
        }
    }

    #[test]
    fn boolean_flags_omitted_when_false() {
        let args = SparkArgs::builder().main_file("s3://b/app.py").build();
        let tokens = build_args(&args);
        assert!(!tokens.contains(&"--verbose".to_owned()));
        assert!(!tokens.contains(&"--supervise".to_owned()));
    }

    #[test]
    fn extra_options_pass_through_in_order() {
        let args = SparkArgs::builder()
            .main_file("s3://b/app.py")
            .extra(vec![
                ("queue".to_owned(), ArgValue::Scalar("prod".to_owned())),
                ("driver_class_path".to_owned(), ArgValue::Scalar("/lib".to_owned())),
                ("some_future_flag".to_owned(), ArgValue::Flag(true)),
                ("ignored_flag".to_owned(), ArgValue::Flag(false)),
                (
                    "archives".to_owned(),
                    ArgValue::Repeated(vec!["a.zip".to_owned(), "b.zip".to_owned()]),
                ),
            ])
            .build();
        let tokens = build_args(&args);
        let joined = tokens.join(" ");
        assert!(joined.contains("--queue prod --driver-class-path /lib --some-future-flag \
                                 --archives a.zip --archives b.zip"));
        assert!(!joined.contains("--ignored-flag"));
    }

    /// Re-parsing the token sequence reproduces the option mapping.
    #[test]
    fn tokens_round_trip() {
        let args = SparkArgs::builder()
            .main_file("resources/pyspark_example.py")
            .deploy_mode(DeployMode::Cluster)
            .master("spark://master:6066")
            .verbose(true)
            .conf(vec!["a=1".to_owned(), "b=2".to_owned()])
            .main_file_args(vec!["x".to_owned(), "y".to_owned()])
            .build();
        let tokens = build_args(&args);

        let mut scalars: HashMap<String, String> = HashMap::new();
        let mut repeated: HashMap<String, Vec<String>> = HashMap::new();
        let mut flags: Vec<String> = Vec::new();
        let mut positional: Vec<String> = Vec::new();
        let mut it = tokens.iter().peekable();
        while let Some(token) = it.next() {
            if let Some(name) = token.strip_prefix("--") {
                match it.peek() {
                    Some(next) if !next.starts_with("--") => {
                        let value = it.next().unwrap().clone();
                        if name == "conf" {
                            repeated.entry(name.to_owned()).or_default().push(value);
                        } else {
                            scalars.insert(name.to_owned(), value);
                        }
                    }
                    _ => flags.push(name.to_owned()),
                }
            } else {
                positional.push(token.clone());
                positional.extend(it.by_ref().cloned());
            }
        }

        assert_eq!(scalars["master"], "spark://master:6066");
        assert_eq!(scalars["deploy-mode"], "cluster");
        assert_eq!(repeated["conf"], vec!["a=1", "b=2"]);
        assert_eq!(flags, vec!["verbose"]);
        assert_eq!(positional, vec!["resources/pyspark_example.py", "x", "y"]);
    }
}
