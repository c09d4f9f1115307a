//! Command Parser — model text to typed commands, one per line.
//!
//! Each non-empty line is tokenized on whitespace; the first token picks the
//! verb (case-insensitive) and the rest are positional arguments. A bad line
//! becomes a [`ParseError`] in its slot of the output and parsing carries on.

use minebrain_core::{clip_chat, Command, ParseError, ParseErrorKind, Target, Verb};

const ENTITY_NAMESPACE: &str = "minecraft:";

/// Parse a reply into one result per non-empty line, in line order.
pub fn parse(text: &str) -> Vec<Result<Command, ParseError>> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            Some(parse_line(line).map_err(|kind| ParseError {
                line_number: idx + 1,
                line: line.to_string(),
                kind,
            }))
        })
        .collect()
}

/// Parse one trimmed, non-empty line.
pub fn parse_line(line: &str) -> Result<Command, ParseErrorKind> {
    let line = line.trim();
    let (token, rest) = match line.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (line, ""),
    };
    let verb = Verb::from_token(token).ok_or_else(|| ParseErrorKind::UnknownVerb(token.to_uppercase()))?;
    let args: Vec<&str> = rest.split_whitespace().collect();

    match verb {
        Verb::Say => {
            if rest.is_empty() {
                return Err(ParseErrorKind::EmptyMessage);
            }
            Ok(Command::Say {
                message: clip_chat(rest).to_string(),
            })
        }
        Verb::Move => {
            let [x, y, z] = exact::<3>(verb, "x y z", &args)?;
            Ok(Command::Move {
                x: number(verb, "x", x)?,
                y: number(verb, "y", y)?,
                z: number(verb, "z", z)?,
            })
        }
        Verb::Look => {
            let [x, y, z] = exact::<3>(verb, "x y z", &args)?;
            Ok(Command::Look {
                x: number(verb, "x", x)?,
                y: number(verb, "y", y)?,
                z: number(verb, "z", z)?,
            })
        }
        Verb::Mine => {
            exact::<0>(verb, "no arguments", &args)?;
            Ok(Command::Mine)
        }
        Verb::Place => {
            let [slot] = exact::<1>(verb, "slotId", &args)?;
            Ok(Command::Place { slot: integer(verb, "slotId", slot)? })
        }
        Verb::Build => {
            let [size, slot] = exact::<2>(verb, "size slotId", &args)?;
            let size: u32 = integer(verb, "size", size)?;
            if size == 0 {
                return Err(ParseErrorKind::InvalidInteger {
                    verb,
                    arg: "size",
                    value: "0".into(),
                });
            }
            Ok(Command::Build {
                size,
                slot: integer(verb, "slotId", slot)?,
            })
        }
        Verb::Attack => {
            let [target] = exact::<1>(verb, "target", &args)?;
            Ok(Command::Attack { target: parse_target(verb, target)? })
        }
        Verb::Kill => {
            let [target] = exact::<1>(verb, "target", &args)?;
            Ok(Command::Kill { target: parse_target(verb, target)? })
        }
        Verb::GoPlyr => {
            let [player] = exact::<1>(verb, "playerName", &args)?;
            Ok(Command::GoPlyr { player: player.to_string() })
        }
        Verb::Store => {
            let [slot] = exact::<1>(verb, "slotId", &args)?;
            Ok(Command::Store { slot: integer(verb, "slotId", slot)? })
        }
        Verb::Hold => {
            let [slot] = exact::<1>(verb, "slotId", &args)?;
            Ok(Command::Hold { slot: integer(verb, "slotId", slot)? })
        }
    }
}

fn exact<'a, const N: usize>(
    verb: Verb,
    expected: &'static str,
    args: &[&'a str],
) -> Result<[&'a str; N], ParseErrorKind> {
    <[&str; N]>::try_from(args).map_err(|_| ParseErrorKind::Arity {
        verb,
        expected,
        found: args.len(),
    })
}

/// A finite decimal number. `NaN` and infinities are rejected.
fn number(verb: Verb, arg: &'static str, value: &str) -> Result<f64, ParseErrorKind> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ParseErrorKind::InvalidNumber {
            verb,
            arg,
            value: value.to_string(),
        })
}

fn integer<T: std::str::FromStr>(verb: Verb, arg: &'static str, value: &str) -> Result<T, ParseErrorKind> {
    value.parse::<T>().map_err(|_| ParseErrorKind::InvalidInteger {
        verb,
        arg,
        value: value.to_string(),
    })
}

fn parse_target(verb: Verb, token: &str) -> Result<Target, ParseErrorKind> {
    if token.eq_ignore_ascii_case("nearest") {
        return Ok(Target::Nearest);
    }
    let namespaced = token
        .get(..ENTITY_NAMESPACE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ENTITY_NAMESPACE));
    if namespaced {
        let kind = &token[ENTITY_NAMESPACE.len()..];
        if kind.is_empty() {
            return Err(ParseErrorKind::EmptyTarget { verb });
        }
        return Ok(Target::EntityType(kind.to_ascii_lowercase()));
    }
    Ok(Target::PlayerName(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(line: &str) -> Command {
        let mut results = parse(line);
        assert_eq!(results.len(), 1, "expected one result for {line:?}");
        results.remove(0).unwrap()
    }

    fn kind(line: &str) -> ParseErrorKind {
        parse_line(line).unwrap_err()
    }

    #[test]
    fn every_verb_parses() {
        assert_eq!(one("SAY hello there"), Command::Say { message: "hello there".into() });
        assert_eq!(one("MOVE 10 64 -3"), Command::Move { x: 10.0, y: 64.0, z: -3.0 });
        assert_eq!(one("LOOK 0.5 65.2 -1e1"), Command::Look { x: 0.5, y: 65.2, z: -10.0 });
        assert_eq!(one("MINE"), Command::Mine);
        assert_eq!(one("PLACE 36"), Command::Place { slot: 36 });
        assert_eq!(one("BUILD 5 1"), Command::Build { size: 5, slot: 1 });
        assert_eq!(one("ATTACK nearest"), Command::Attack { target: Target::Nearest });
        assert_eq!(
            one("KILL minecraft:ender_dragon"),
            Command::Kill { target: Target::EntityType("ender_dragon".into()) }
        );
        assert_eq!(one("GOPLYR Steve"), Command::GoPlyr { player: "Steve".into() });
        assert_eq!(one("STORE 9"), Command::Store { slot: 9 });
        assert_eq!(one("HOLD 0"), Command::Hold { slot: 0 });
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(one("say hi"), Command::Say { message: "hi".into() });
        assert_eq!(one("GoPlyr alex"), Command::GoPlyr { player: "alex".into() });
        assert_eq!(one("attack NEAREST"), Command::Attack { target: Target::Nearest });
        assert_eq!(
            one("kill Minecraft:Pig"),
            Command::Kill { target: Target::EntityType("pig".into()) }
        );
    }

    #[test]
    fn say_keeps_inner_spacing_and_truncates() {
        assert_eq!(one("SAY  a  b "), Command::Say { message: "a  b".into() });

        let long = format!("SAY {}", "x".repeat(300));
        match one(&long) {
            Command::Say { message } => assert_eq!(message.len(), 256),
            other => panic!("Expected SAY, got {other:?}"),
        }
        assert_eq!(kind("SAY"), ParseErrorKind::EmptyMessage);
        assert_eq!(kind("SAY    "), ParseErrorKind::EmptyMessage);
    }

    #[test]
    fn players_are_names_not_targets() {
        assert_eq!(
            one("ATTACK Notch"),
            Command::Attack { target: Target::PlayerName("Notch".into()) }
        );
        assert_eq!(kind("KILL minecraft:"), ParseErrorKind::EmptyTarget { verb: Verb::Kill });
    }

    #[test]
    fn unknown_verb_is_uppercased() {
        assert_eq!(kind("dance now"), ParseErrorKind::UnknownVerb("DANCE".into()));
        assert_eq!(kind("TURN left"), ParseErrorKind::UnknownVerb("TURN".into()));
    }

    #[test]
    fn numbers_never_default_to_zero() {
        assert!(matches!(kind("MOVE 10 abc 3"), ParseErrorKind::InvalidNumber { arg: "y", .. }));
        assert!(matches!(kind("MOVE NaN 1 1"), ParseErrorKind::InvalidNumber { arg: "x", .. }));
        assert!(matches!(kind("LOOK 1 1 inf"), ParseErrorKind::InvalidNumber { arg: "z", .. }));
    }

    #[test]
    fn integers_are_range_checked() {
        assert!(matches!(kind("HOLD -1"), ParseErrorKind::InvalidInteger { .. }));
        assert!(matches!(kind("HOLD 1.5"), ParseErrorKind::InvalidInteger { .. }));
        assert!(matches!(kind("STORE 70000"), ParseErrorKind::InvalidInteger { .. }));
        assert!(matches!(kind("BUILD 0 1"), ParseErrorKind::InvalidInteger { arg: "size", .. }));
        assert!(matches!(kind("BUILD 3 x"), ParseErrorKind::InvalidInteger { arg: "slotId", .. }));
    }

    #[test]
    fn arity_is_strict() {
        assert_eq!(
            kind("MOVE 1 2"),
            ParseErrorKind::Arity { verb: Verb::Move, expected: "x y z", found: 2 }
        );
        assert_eq!(
            kind("MINE now"),
            ParseErrorKind::Arity { verb: Verb::Mine, expected: "no arguments", found: 1 }
        );
        assert!(matches!(kind("BUILD 5"), ParseErrorKind::Arity { found: 1, .. }));
        assert!(matches!(kind("KILL"), ParseErrorKind::Arity { found: 0, .. }));
        assert!(matches!(kind("GOPLYR a b"), ParseErrorKind::Arity { found: 2, .. }));
    }

    #[test]
    fn bad_lines_do_not_stop_the_batch() {
        let results = parse("SAY hi\nDANCE\n\n  MOVE 1 2 3  \nHOLD x\nMINE\r\n");
        assert_eq!(results.len(), 5);
        assert!(results[0].is_ok());

        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.line_number, 2);
        assert_eq!(err.chat_message(), "Unknown command: DANCE");

        assert_eq!(results[2], Ok(Command::Move { x: 1.0, y: 2.0, z: 3.0 }));

        let err = results[3].as_ref().unwrap_err();
        assert_eq!(err.line_number, 5);
        assert_eq!(err.line, "HOLD x");

        assert_eq!(results[4], Ok(Command::Mine));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n  \n\t\n").is_empty());
    }
}
