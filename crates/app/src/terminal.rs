//! Line-oriented front end for a practice session.
//!
//! Each line read from the input becomes one or two `PracticeInput`s; the
//! snapshot after each step is printed. The writing canvas is stood in for by
//! typing the glyph itself.

use std::io::{self, BufRead, Write};

use hanzi_core::model::{ScoreBand, SourceKind};
use services::{Effect, Phase, PracticeInput, PracticeMode, PracticeRunner, PracticeSnapshot};

const QUIT: &str = ":q";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Send(Vec<PracticeInput>),
    Hint(&'static str),
    Quit,
}

fn interpret(snap: &PracticeSnapshot, line: &str) -> Action {
    if line.trim() == QUIT {
        return Action::Quit;
    }
    let trimmed = line.trim();
    let one = |input: PracticeInput| Action::Send(vec![input]);
    match (snap.mode, snap.phase) {
        (PracticeMode::Flashcards, phase) => match trimmed {
            "p" => one(PracticeInput::Previous),
            "n" => one(PracticeInput::Next),
            "f" => one(PracticeInput::Reveal),
            "" if phase == Phase::Revealed && snap.can_advance => one(PracticeInput::Next),
            "" => one(PracticeInput::Reveal),
            _ => Action::Hint("enter flips, n next, p previous"),
        },
        (PracticeMode::Written, Phase::Presenting) => {
            one(PracticeInput::SubmitAnswer(line.to_owned()))
        }
        (PracticeMode::Written, Phase::MustRetype) => {
            one(PracticeInput::SubmitRetype(line.to_owned()))
        }
        (PracticeMode::MultipleChoice, Phase::Presenting) => match trimmed.parse::<usize>() {
            Ok(n) if n > 0 => one(PracticeInput::SelectOption(n - 1)),
            _ => Action::Hint("type the number of your answer"),
        },
        (PracticeMode::Writing, Phase::Presenting) => match trimmed {
            "x" => one(PracticeInput::Mistake),
            "r" => one(PracticeInput::Restart),
            "" => Action::Hint("type the character, x for a miss, r to restart"),
            glyph => match snap.item.as_ref() {
                Some(item) if glyph == item.primary() => Action::Send(vec![
                    PracticeInput::CorrectStroke,
                    PracticeInput::Complete { item_id: item.id() },
                ]),
                _ => one(PracticeInput::Mistake),
            },
        },
        (_, _) => one(PracticeInput::Next),
    }
}

fn render(snap: &PracticeSnapshot, out: &mut impl Write) -> io::Result<()> {
    let Some(item) = snap.item.as_ref() else {
        return Ok(());
    };
    writeln!(out)?;
    writeln!(out, "[{}/{}] {}", snap.position + 1, snap.total, snap.mode)?;
    match (snap.mode, snap.phase) {
        (PracticeMode::Flashcards, Phase::Revealed) => {
            writeln!(out, "  {}  →  {}", item.primary(), item.secondary())?;
            if let Some(extra) = item.tertiary() {
                writeln!(out, "  {extra}")?;
            }
        }
        (PracticeMode::Writing, Phase::Presenting) => {
            writeln!(out, "  write: {}  ({})", item.primary(), item.secondary())?;
            if let Some(meaning) = item.tertiary() {
                writeln!(out, "  meaning: {meaning}")?;
            }
            writeln!(
                out,
                "  strokes {}  mistakes {}",
                snap.strokes, snap.mistakes
            )?;
        }
        (PracticeMode::Writing, _) => {
            let note = if item.source() == SourceKind::Catalog {
                "progress saved"
            } else {
                "done"
            };
            writeln!(out, "  {} ✓ {note}. enter for next", item.primary())?;
        }
        (PracticeMode::MultipleChoice, phase) => {
            writeln!(out, "  {}", item.primary())?;
            for (idx, option) in snap.options.iter().enumerate() {
                let marker = match (phase, snap.selected) {
                    (Phase::Answered { .. }, _) if option == item.answer() => "✓",
                    (Phase::Answered { .. }, Some(sel)) if sel == idx => "✗",
                    _ => " ",
                };
                writeln!(out, "  {marker} {}. {option}", idx + 1)?;
            }
        }
        (_, Phase::MustRetype) => {
            writeln!(out, "  {}", item.primary())?;
            writeln!(out, "  ✗ correct answer: {}. type it to continue", item.answer())?;
        }
        (_, Phase::Answered { correct: true }) => {
            writeln!(out, "  ✓ correct. enter for next")?;
        }
        (_, Phase::Completed) => writeln!(out, "  ✓ enter for next")?,
        _ => writeln!(out, "  {}", item.primary())?,
    }
    Ok(())
}

fn render_results(runner: &PracticeRunner, out: &mut impl Write) -> io::Result<()> {
    let session = runner.session();
    let score = session.score();
    writeln!(out)?;
    if !session.mode().is_quiz() {
        writeln!(out, "Reviewed {} cards.", runner.snapshot().total)?;
        return Ok(());
    }
    let headline = match score.band() {
        ScoreBand::Perfect => "Perfect!",
        ScoreBand::Good => "Good job!",
        ScoreBand::KeepStudying => "Keep studying!",
    };
    writeln!(out, "{headline} {score}")?;
    for result in session.log().results() {
        let mark = if result.correct { "✓" } else { "✗" };
        writeln!(
            out,
            "  {mark} {}  {}  (you: {})",
            result.item.primary(),
            result.item.answer(),
            result.user_answer
        )?;
    }
    Ok(())
}

/// Run `runner` until the session finishes, the input ends or the learner quits.
///
/// # Errors
///
/// Returns I/O errors from reading `input` or writing `out`.
pub async fn drive(
    runner: &mut PracticeRunner,
    input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "{QUIT} quits")?;
    render(&runner.snapshot(), out)?;
    let mut lines = input.lines();

    while !runner.session().is_finished() {
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let snap = runner.snapshot();
        match interpret(&snap, &line) {
            Action::Quit => break,
            Action::Hint(hint) => writeln!(out, "  {hint}")?,
            Action::Send(inputs) => {
                for input in inputs {
                    match runner.apply(input) {
                        Ok(effects) => {
                            if effects.contains(&Effect::ResetCanvas) {
                                writeln!(out, "  canvas cleared")?;
                            }
                        }
                        Err(rejected) => {
                            writeln!(out, "  {rejected}")?;
                            break;
                        }
                    }
                }
                render(&runner.snapshot(), out)?;
                out.flush()?;
                let step = runner.flush().await;
                for warning in &step.warnings {
                    writeln!(out, "  ! {warning}")?;
                }
            }
        }
    }

    if runner.session().is_finished() {
        render_results(runner, out)?;
    }
    out.flush()
}
