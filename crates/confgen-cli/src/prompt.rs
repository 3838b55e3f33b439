//! Terminal prompts behind the core's choice providers.
//!
//! With the `interactive` feature and a terminal on stdin, prompts use
//! dialoguer. Otherwise one line is read from stdin. A failed or empty read
//! answers with the safe default: `cancel` for merges, one item for lists.

use std::io::{self, BufRead, Write};

use confgen_core::prelude::{MergeChoice, MergeRequest};
use tracing::warn;

/// Ask how a loaded value set should combine with the current values.
pub fn choose_merge(request: &MergeRequest<'_>) -> MergeChoice {
    let question = merge_question(request);

    #[cfg(feature = "interactive")]
    if io::IsTerminal::is_terminal(&io::stdin()) {
        let labels: Vec<&str> = MergeChoice::ALL.iter().map(|c| c.as_str()).collect();
        return match dialoguer::Select::new()
            .with_prompt(&question)
            .items(&labels)
            .default(0)
            .interact_opt()
        {
            Ok(Some(i)) => MergeChoice::ALL[i],
            Ok(None) => MergeChoice::Cancel,
            Err(e) => {
                warn!(error = %e, "Prompt failed; cancelling load");
                MergeChoice::Cancel
            }
        };
    }

    let answer = read_answer(&format!("{question} [overwrite/merge/cancel] "));
    parse_merge_answer(answer.as_deref())
}

/// Ask how many blank items a new list starts with.
pub fn ask_item_count(list: &str, fields: &[String]) -> usize {
    let question = format!("Items for list '{}' ({})", list, fields.join(", "));

    #[cfg(feature = "interactive")]
    if io::IsTerminal::is_terminal(&io::stdin()) {
        return match dialoguer::Input::<usize>::new()
            .with_prompt(&question)
            .default(1)
            .interact_text()
        {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Prompt failed; using one item");
                1
            }
        };
    }

    let answer = read_answer(&format!("{question} [1] "));
    parse_count_answer(answer.as_deref())
}

pub(crate) fn merge_question(request: &MergeRequest<'_>) -> String {
    let mut question = format!(
        "'{}' sets {} known variable(s)",
        request.source, request.matching
    );
    if request.ignored > 0 {
        question.push_str(&format!(", {} unknown ignored", request.ignored));
    }
    question
}

fn parse_merge_answer(answer: Option<&str>) -> MergeChoice {
    answer
        .and_then(|a| a.parse().ok())
        .unwrap_or(MergeChoice::Cancel)
}

fn parse_count_answer(answer: Option<&str>) -> usize {
    match answer.map(str::trim) {
        None | Some("") => 1,
        Some(a) => a.parse().unwrap_or(1),
    }
}

/// Prompt on stderr and read one line from stdin.
fn read_answer(prompt: &str) -> Option<String> {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{prompt}");
    let _ = stderr.flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().to_string()),
        Err(e) => {
            warn!(error = %e, "Could not read answer");
            None
        }
    }
}
