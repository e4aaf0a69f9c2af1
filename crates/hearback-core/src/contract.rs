//! Command-line contract between the coordinator and a collection agent.
//!
//! The agent is started as `<program> [args..] --prompt <text>
//! --output-file <channel> --predefined-options <o1|||o2>` and reports its
//! outcome through its exit status and the channel file.

/// Flag carrying the prompt shown to the human.
pub const PROMPT_FLAG: &str = "--prompt";
/// Flag carrying the result channel path.
pub const OUTPUT_FILE_FLAG: &str = "--output-file";
/// Flag carrying the joined predefined options.
pub const OPTIONS_FLAG: &str = "--predefined-options";
/// Separator between predefined options on the command line.
pub const OPTION_SEPARATOR: &str = "|||";

/// Join predefined options for the command line. `None` and an empty list
/// both produce an empty string.
pub fn join_options(options: Option<&[String]>) -> String {
    options
        .map(|opts| opts.join(OPTION_SEPARATOR))
        .unwrap_or_default()
}

/// Split a joined option string, dropping empty entries.
pub fn split_options(joined: &str) -> Vec<String> {
    joined
        .split(OPTION_SEPARATOR)
        .filter(|opt| !opt.is_empty())
        .map(String::from)
        .collect()
}
