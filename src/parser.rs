use std::path::PathBuf;

use tracing::debug;

use crate::ast::{OutputTarget, Pipeline, PipelineStage};
use crate::tokenizer::Token;
use crate::types::{ShellError, ShellResult};

/// Splits expanded tokens into pipeline stages.
///
/// `#` drops the rest of the line, `&` marks the pipeline as background and
/// ends it, `>` takes exactly one following word as the file the last stage
/// writes to and ends scanning.
pub fn parse<I>(tokens: I) -> ShellResult<Pipeline>
where
    I: IntoIterator<Item = Token>,
{
    let mut tokens = tokens.into_iter();
    let mut stages: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut redirect: Option<PathBuf> = None;
    let mut background = false;

    while let Some(token) = tokens.next() {
        match token {
            Token::Word(word) => current.push(word),
            Token::Comment => break,
            Token::Background => {
                background = true;
                break;
            }
            Token::Pipe => {
                if current.is_empty() {
                    return Err(ShellError::syntax("expected a command before `|`"));
                }
                stages.push(std::mem::take(&mut current));
            }
            Token::Redirect => {
                let Some(Token::Word(path)) = tokens.next() else {
                    return Err(ShellError::syntax("expected a file name after `>`"));
                };
                redirect = Some(PathBuf::from(path));
                // anything after the target is dropped, but a trailing `&` still counts
                background = tokens
                    .by_ref()
                    .take_while(|t| *t != Token::Comment)
                    .any(|t| t == Token::Background);
                break;
            }
        }
    }

    if current.is_empty() {
        if !stages.is_empty() {
            return Err(ShellError::syntax("expected a command after `|`"));
        }
        if redirect.is_some() {
            return Err(ShellError::syntax("expected a command before `>`"));
        }
        return Ok(Pipeline {
            stages: Vec::new(),
            background,
        });
    }
    stages.push(current);

    let mut stages: Vec<PipelineStage> = stages
        .into_iter()
        .map(|tokens| PipelineStage {
            tokens,
            output: OutputTarget::NextStageInput,
        })
        .collect();
    if let Some(terminal) = stages.last_mut() {
        terminal.output = redirect.map_or(OutputTarget::Inherited, OutputTarget::File);
    }

    let pipeline = Pipeline { stages, background };
    debug!(?pipeline, "built pipeline");
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_words(words: &[&str]) -> ShellResult<Pipeline> {
        parse(words.iter().map(|w| match *w {
            "|" => Token::Pipe,
            ">" => Token::Redirect,
            "&" => Token::Background,
            "#" => Token::Comment,
            w => Token::Word(w.to_string()),
        }))
    }

    fn stage(tokens: &[&str], output: OutputTarget) -> PipelineStage {
        PipelineStage {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            output,
        }
    }

    #[test]
    fn single_command() {
        let pipeline = parse_words(&["ls", "-la"]).unwrap();
        assert_eq!(pipeline.stages, vec![stage(&["ls", "-la"], OutputTarget::Inherited)]);
        assert!(!pipeline.background);
    }

    #[test]
    fn pipes_split_stages() {
        let pipeline = parse_words(&["cat", "f", "|", "sort", "|", "uniq", "-c"]).unwrap();
        assert_eq!(
            pipeline.stages,
            vec![
                stage(&["cat", "f"], OutputTarget::NextStageInput),
                stage(&["sort"], OutputTarget::NextStageInput),
                stage(&["uniq", "-c"], OutputTarget::Inherited),
            ]
        );
    }

    #[test]
    fn redirect_applies_to_last_stage() {
        let pipeline = parse_words(&["echo", "hi", "|", "tr", "a-z", "A-Z", ">", "out.txt"]).unwrap();
        assert_eq!(pipeline.stages[0].output, OutputTarget::NextStageInput);
        assert_eq!(
            pipeline.stages[1],
            stage(&["tr", "a-z", "A-Z"], OutputTarget::File("out.txt".into()))
        );
    }

    #[test]
    fn background_ends_the_line() {
        let pipeline = parse_words(&["sleep", "1", "&", "echo", "ignored"]).unwrap();
        assert!(pipeline.background);
        assert_eq!(pipeline.stages, vec![stage(&["sleep", "1"], OutputTarget::Inherited)]);

        let pipeline = parse_words(&["echo", "hi", ">", "f", "&"]).unwrap();
        assert!(pipeline.background);
        assert_eq!(pipeline.stages[0].output, OutputTarget::File("f".into()));
    }

    #[test]
    fn words_after_redirect_target_are_dropped() {
        let pipeline = parse_words(&["ls", ">", "a", "b", "&"]).unwrap();
        assert!(pipeline.background);
        assert_eq!(pipeline.stages, vec![stage(&["ls"], OutputTarget::File("a".into()))]);

        let pipeline = parse_words(&["ls", ">", "a", "#", "&"]).unwrap();
        assert!(!pipeline.background);
    }

    #[test]
    fn comment_discards_rest() {
        let pipeline = parse_words(&["echo", "a", "#", "|", "wc"]).unwrap();
        assert_eq!(pipeline.stages, vec![stage(&["echo", "a"], OutputTarget::Inherited)]);
    }

    #[test]
    fn empty_input_is_empty_pipeline() {
        assert!(parse_words(&[]).unwrap().is_empty());
        assert!(parse_words(&["#", "ls"]).unwrap().is_empty());
        assert!(parse_words(&["&"]).unwrap().is_empty());
    }

    #[test]
    fn malformed_pipelines() {
        for words in [
            &["ls", "|"][..],
            &["|", "ls"],
            &["ls", "|", "|", "wc"],
            &["ls", ">"],
            &["ls", ">", "|"],
            &[">", "out"],
            &["ls", "|", "&"],
        ] {
            assert!(
                matches!(parse_words(words), Err(ShellError::Syntax(_))),
                "{words:?} should be rejected"
            );
        }
    }

    #[test]
    fn command_text_round_trips_structure() {
        let pipeline = parse_words(&["sleep", "5", "|", "cat", ">", "log", "&"]).unwrap();
        assert_eq!(pipeline.command_text(), "sleep 5 | cat > log &");
    }
}
