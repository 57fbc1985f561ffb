//! Utterance grammar: typed statements and their canonical text form.
//!
//! A statement is one line such as `COMINGOUT Agent[03] SEER`, optionally
//! prefixed by the agent it is spoken by (`Agent[01] VOTE Agent[02]`).
//! Operators wrap parenthesized statements: `Agent[01] REQUEST(VOTE Agent[02])`,
//! `BECAUSE (DIVINED Agent[02] WEREWOLF) (VOTE Agent[02])`.
//!
//! Parsing and rendering are pure; `Content::parse(&c.text()) == Ok(c)` for
//! every statement built through the constructors below.

use crate::agent::Agent;
use crate::error::ProtocolError;
use crate::types::{Operator, Role, Species, TalkType, Topic};
use std::fmt;
use std::str::FromStr;

/// Reference to an earlier utterance, used by AGREE and DISAGREE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceRef {
    pub talk_type: TalkType,
    pub day: u32,
    pub idx: u32,
}

impl UtteranceRef {
    pub fn new(talk_type: TalkType, day: u32, idx: u32) -> Self {
        Self { talk_type, day, idx }
    }
}

/// Parsed meaning of one utterance.
///
/// Fields are private: which of them are populated is fixed by the topic,
/// and only the constructors can produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    topic: Topic,
    subject: Option<Agent>,
    target: Option<Agent>,
    role: Option<Role>,
    result: Option<Species>,
    utterance: Option<UtteranceRef>,
    operator: Option<Operator>,
    operands: Vec<Content>,
}

impl Content {
    fn bare(topic: Topic) -> Self {
        Self {
            topic,
            subject: None,
            target: None,
            role: None,
            result: None,
            utterance: None,
            operator: None,
            operands: Vec::new(),
        }
    }

    fn targeted(topic: Topic, target: Agent) -> Self {
        Self {
            target: Some(target),
            ..Self::bare(topic)
        }
    }

    fn with_role(topic: Topic, target: Agent, role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::targeted(topic, target)
        }
    }

    fn with_result(topic: Topic, target: Agent, result: Species) -> Self {
        Self {
            result: Some(result),
            ..Self::targeted(topic, target)
        }
    }

    fn referencing(topic: Topic, utterance: UtteranceRef) -> Self {
        Self {
            utterance: Some(utterance),
            ..Self::bare(topic)
        }
    }

    fn operation(operator: Operator, operands: Vec<Content>) -> Self {
        Self {
            operator: Some(operator),
            operands,
            ..Self::bare(Topic::Operator)
        }
    }

    pub fn skip() -> Self {
        Self::bare(Topic::Skip)
    }

    pub fn over() -> Self {
        Self::bare(Topic::Over)
    }

    /// # Errors
    /// Returns `InvalidAgentIndex` when `target` is not a player (index 0).
    pub fn estimate(target: Agent, role: Role) -> Result<Self, ProtocolError> {
        Ok(Self::with_role(Topic::Estimate, require_player(target)?, role))
    }

    pub fn comingout(target: Agent, role: Role) -> Result<Self, ProtocolError> {
        Ok(Self::with_role(Topic::Comingout, require_player(target)?, role))
    }

    pub fn divination(target: Agent) -> Self {
        Self::targeted(Topic::Divination, target)
    }

    /// # Errors
    /// Returns `InvalidAgentIndex` when `target` is not a player (index 0).
    pub fn divined(target: Agent, result: Species) -> Result<Self, ProtocolError> {
        Ok(Self::with_result(Topic::Divined, require_player(target)?, result))
    }

    pub fn identified(target: Agent, result: Species) -> Result<Self, ProtocolError> {
        Ok(Self::with_result(Topic::Identified, require_player(target)?, result))
    }

    pub fn guard(target: Agent) -> Self {
        Self::targeted(Topic::Guard, target)
    }

    pub fn guarded(target: Agent) -> Self {
        Self::targeted(Topic::Guarded, target)
    }

    pub fn vote(target: Agent) -> Self {
        Self::targeted(Topic::Vote, target)
    }

    pub fn attack(target: Agent) -> Self {
        Self::targeted(Topic::Attack, target)
    }

    pub fn agree(utterance: UtteranceRef) -> Self {
        Self::referencing(Topic::Agree, utterance)
    }

    pub fn disagree(utterance: UtteranceRef) -> Self {
        Self::referencing(Topic::Disagree, utterance)
    }

    /// `requester` asks for `inner`. When `inner` names no subject of its
    /// own, the requester becomes its subject, as when parsed from text.
    pub fn request(requester: Option<Agent>, inner: Content) -> Self {
        let inner = match requester {
            Some(requester) if inner.subject.is_none() => inner.spoken_by(requester),
            _ => inner,
        };
        Self {
            subject: requester,
            ..Self::operation(Operator::Request, vec![inner])
        }
    }

    pub fn because(reason: Content, action: Content) -> Self {
        Self::operation(Operator::Because, vec![reason, action])
    }

    /// # Errors
    /// Fails when no operand is given.
    pub fn and(operands: Vec<Content>) -> Result<Self, ProtocolError> {
        Self::junction(Operator::And, operands)
    }

    /// # Errors
    /// Fails when no operand is given.
    pub fn or(operands: Vec<Content>) -> Result<Self, ProtocolError> {
        Self::junction(Operator::Or, operands)
    }

    fn junction(operator: Operator, operands: Vec<Content>) -> Result<Self, ProtocolError> {
        let content = Self::operation(operator, operands);
        if content.operands.is_empty() {
            return Err(ProtocolError::malformed(
                &content.text(),
                format!("{} requires at least one operand", operator),
            ));
        }
        Ok(content)
    }

    /// Mark the statement as spoken by `subject`. A REQUEST passes the
    /// subject on to a requested statement that names none.
    pub fn spoken_by(mut self, subject: Agent) -> Self {
        self.subject = Some(subject);
        if self.operator == Some(Operator::Request) {
            self.operands = std::mem::take(&mut self.operands)
                .into_iter()
                .map(|inner| match inner.subject {
                    None => inner.spoken_by(subject),
                    Some(_) => inner,
                })
                .collect();
        }
        self
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn subject(&self) -> Option<Agent> {
        self.subject
    }

    pub fn target(&self) -> Option<Agent> {
        self.target
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn result(&self) -> Option<Species> {
        self.result
    }

    pub fn utterance(&self) -> Option<UtteranceRef> {
        self.utterance
    }

    pub fn operator(&self) -> Option<Operator> {
        self.operator
    }

    pub fn operands(&self) -> &[Content] {
        &self.operands
    }

    /// Canonical text form.
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Parse one utterance line.
    ///
    /// # Errors
    /// Returns `MalformedUtterance` for empty text, unknown topics, wrong
    /// token counts, unknown keywords, or negative utterance references.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::malformed(text, "empty utterance"));
        }

        let (subject, rest) = split_subject(trimmed);

        if let Some((operator, body)) = split_operator(rest) {
            return parse_operation(text, subject, operator, body);
        }

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let keyword = tokens.first().copied().unwrap_or_default();
        let topic = match Topic::from_str(keyword) {
            Ok(Topic::Operator) | Err(_) => {
                return Err(ProtocolError::malformed(
                    text,
                    format!("unknown topic {:?}", keyword),
                ))
            }
            Ok(topic) => topic,
        };

        if let Some(arity) = topic.arity() {
            if tokens.len() != arity {
                return Err(ProtocolError::malformed(
                    text,
                    format!("{} expects {} tokens, got {}", topic, arity, tokens.len()),
                ));
            }
        }

        let content = match topic {
            Topic::Skip => Content::skip(),
            Topic::Over => Content::over(),
            Topic::Divination => Content::divination(parse_target(text, tokens[1])?),
            Topic::Guard => Content::guard(parse_target(text, tokens[1])?),
            Topic::Guarded => Content::guarded(parse_target(text, tokens[1])?),
            Topic::Vote => Content::vote(parse_target(text, tokens[1])?),
            Topic::Attack => Content::attack(parse_target(text, tokens[1])?),
            Topic::Estimate | Topic::Comingout => {
                let target = parse_player(text, tokens[1])?;
                let role = parse_keyword::<Role>(text, tokens[2], "role")?;
                Content::with_role(topic, target, role)
            }
            Topic::Divined | Topic::Identified => {
                let target = parse_player(text, tokens[1])?;
                let result = parse_keyword::<Species>(text, tokens[2], "species")?;
                Content::with_result(topic, target, result)
            }
            Topic::Agree | Topic::Disagree => {
                let talk_type = parse_keyword::<TalkType>(text, tokens[1], "channel")?;
                let day = parse_prefixed_number(text, tokens[2], "day")?;
                let idx = parse_prefixed_number(text, tokens[3], "ID:")?;
                Content::referencing(topic, UtteranceRef::new(talk_type, day, idx))
            }
            Topic::Operator => {
                return Err(ProtocolError::malformed(text, "operator without operands"))
            }
        };

        Ok(Content { subject, ..content })
    }
}

impl FromStr for Content {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Content::parse(s)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(subject) = self.subject {
            write!(f, "{} ", subject)?;
        }

        if let Some(operator) = self.operator {
            return match operator {
                Operator::Request => {
                    write!(f, "{}(", operator)?;
                    for operand in &self.operands {
                        write!(f, "{}", operand)?;
                    }
                    write!(f, ")")
                }
                Operator::Because | Operator::And | Operator::Or => {
                    write!(f, "{}", operator)?;
                    for operand in &self.operands {
                        write!(f, " ({})", operand)?;
                    }
                    Ok(())
                }
            };
        }

        write!(f, "{}", self.topic)?;
        if let Some(utterance) = self.utterance {
            write!(
                f,
                " {} day{} ID:{}",
                utterance.talk_type, utterance.day, utterance.idx
            )?;
        }
        if let Some(target) = self.target {
            write!(f, " {}", target)?;
        }
        if let Some(role) = self.role {
            write!(f, " {}", role)?;
        }
        if let Some(result) = self.result {
            write!(f, " {}", result)?;
        }
        Ok(())
    }
}

/// Extract the agent index from a token such as `Agent[03]` or `Agent3`.
pub fn parse_agent_token(token: &str) -> Option<Agent> {
    let rest = token.strip_prefix("Agent")?;
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().map(Agent::from)
}

fn split_subject(text: &str) -> (Option<Agent>, &str) {
    let Some((first, rest)) = text.split_once(char::is_whitespace) else {
        return (None, text);
    };
    // Targets never come first, so a leading agent is always the subject.
    match parse_agent_token(first) {
        Some(agent) if !first.contains('(') => (Some(agent), rest.trim_start()),
        _ => (None, text),
    }
}

fn split_operator(text: &str) -> Option<(Operator, &str)> {
    let open = text.find('(')?;
    let keyword = text[..open].trim();
    let operator = Operator::from_str(keyword).ok()?;
    Some((operator, &text[open..]))
}

fn parse_operation(
    text: &str,
    subject: Option<Agent>,
    operator: Operator,
    body: &str,
) -> Result<Content, ProtocolError> {
    let groups = split_groups(text, body)?;
    let operands = groups
        .into_iter()
        .map(Content::parse)
        .collect::<Result<Vec<_>, _>>()?;

    let expected = match operator {
        Operator::Request => operands.len() == 1,
        Operator::Because => operands.len() == 2,
        Operator::And | Operator::Or => !operands.is_empty(),
    };
    if !expected {
        return Err(ProtocolError::malformed(
            text,
            format!("{} has {} operands", operator, operands.len()),
        ));
    }

    let content = Content::operation(operator, operands);
    Ok(match subject {
        Some(subject) => content.spoken_by(subject),
        None => content,
    })
}

/// Split `(a) (b (c))` into `["a", "b (c)"]`.
fn split_groups<'a>(text: &str, body: &'a str) -> Result<Vec<&'a str>, ProtocolError> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in body.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err(ProtocolError::malformed(text, "unbalanced parentheses"));
                }
                depth -= 1;
                if depth == 0 {
                    groups.push(&body[start..i]);
                }
            }
            c if depth == 0 && !c.is_whitespace() => {
                return Err(ProtocolError::malformed(
                    text,
                    format!("unexpected {:?} between operands", c),
                ));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ProtocolError::malformed(text, "unbalanced parentheses"));
    }
    Ok(groups)
}

fn parse_target(text: &str, token: &str) -> Result<Agent, ProtocolError> {
    parse_agent_token(token).ok_or_else(|| {
        ProtocolError::malformed(text, format!("expected agent reference, got {:?}", token))
    })
}

/// Targets of role and species statements must be real players (index >= 1).
fn require_player(target: Agent) -> Result<Agent, ProtocolError> {
    if target.index() < 1 {
        return Err(ProtocolError::InvalidAgentIndex(i64::from(target.index())));
    }
    Ok(target)
}

fn parse_player(text: &str, token: &str) -> Result<Agent, ProtocolError> {
    let agent = parse_target(text, token)?;
    if agent.index() < 1 {
        return Err(ProtocolError::malformed(
            text,
            format!("agent index must be at least 1, got {}", agent.index()),
        ));
    }
    Ok(agent)
}

fn parse_keyword<T: FromStr>(text: &str, token: &str, kind: &str) -> Result<T, ProtocolError> {
    T::from_str(token)
        .map_err(|_| ProtocolError::malformed(text, format!("unknown {} {:?}", kind, token)))
}

fn parse_prefixed_number(text: &str, token: &str, prefix: &str) -> Result<u32, ProtocolError> {
    let digits = token
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &token[prefix.len()..])
        .ok_or_else(|| {
            ProtocolError::malformed(text, format!("expected {}<N>, got {:?}", prefix, token))
        })?;

    let value: i64 = digits.parse().map_err(|_| {
        ProtocolError::malformed(text, format!("invalid number in {:?}", token))
    })?;
    u32::try_from(value).map_err(|_| {
        ProtocolError::malformed(text, format!("{} must be non-negative, got {}", prefix, value))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn agent(idx: u32) -> Agent {
        Agent::from(idx)
    }

    fn assert_malformed(text: &str) {
        match Content::parse(text) {
            Err(ProtocolError::MalformedUtterance { .. }) => {}
            other => panic!("Expected MalformedUtterance for {:?}, got {:?}", text, other),
        }
    }

    #[test]
    fn test_comingout_renders_and_parses() {
        let content = Content::comingout(agent(3), Role::Seer).unwrap();
        assert_eq!(content.text(), "COMINGOUT Agent[03] SEER");

        let parsed = Content::parse("COMINGOUT Agent[03] SEER").unwrap();
        assert_eq!(parsed.topic(), Topic::Comingout);
        assert_eq!(parsed.target().unwrap().index(), 3);
        assert_eq!(parsed.role(), Some(Role::Seer));
        assert_eq!(parsed, content);
    }

    #[test]
    fn test_skip_and_over() {
        assert_eq!(Content::skip().text(), "Skip");
        assert_eq!(Content::over().text(), "Over");
        assert_eq!(Content::parse("Skip").unwrap(), Content::skip());
        assert_eq!(Content::parse("OVER").unwrap(), Content::over());
    }

    #[test]
    fn test_targeted_topics() {
        let parsed = Content::parse("VOTE Agent[07]").unwrap();
        assert_eq!(parsed, Content::vote(agent(7)));
        assert!(parsed.role().is_none());
        assert!(parsed.result().is_none());

        assert_eq!(Content::parse("GUARD Agent2").unwrap(), Content::guard(agent(2)));
        assert_eq!(
            Content::parse("ATTACK Agent[11]").unwrap(),
            Content::attack(agent(11))
        );
    }

    #[test]
    fn test_divined_result() {
        let parsed = Content::parse("DIVINED Agent[04] WEREWOLF").unwrap();
        assert_eq!(parsed.result(), Some(Species::Werewolf));
        assert_eq!(parsed, Content::divined(agent(4), Species::Werewolf).unwrap());
    }

    #[test]
    fn test_agree_reference() {
        let parsed = Content::parse("AGREE TALK day1 ID:3").unwrap();
        assert_eq!(
            parsed.utterance(),
            Some(UtteranceRef::new(TalkType::Talk, 1, 3))
        );
        assert_eq!(parsed.text(), "AGREE TALK day1 ID:3");

        let content = Content::disagree(UtteranceRef::new(TalkType::Whisper, 2, 0));
        assert_eq!(content.text(), "DISAGREE WHISPER day2 ID:0");
    }

    #[test]
    fn test_spoken_by_prefix() {
        let parsed = Content::parse("Agent[01] VOTE Agent[02]").unwrap();
        assert_eq!(parsed.subject(), Some(agent(1)));
        assert_eq!(parsed.target(), Some(agent(2)));
        assert_eq!(parsed.text(), "Agent[01] VOTE Agent[02]");
    }

    #[test]
    fn test_request_takes_requester_as_inner_subject() {
        let parsed = Content::parse("Agent[01] REQUEST(VOTE Agent[02])").unwrap();
        assert_eq!(parsed.topic(), Topic::Operator);
        assert_eq!(parsed.operator(), Some(Operator::Request));
        assert_eq!(parsed.subject(), Some(agent(1)));

        let inner = &parsed.operands()[0];
        assert_eq!(inner.topic(), Topic::Vote);
        assert_eq!(inner.subject(), Some(agent(1)));
        assert_eq!(inner.target(), Some(agent(2)));

        let built = Content::request(Some(agent(1)), Content::vote(agent(2)));
        assert_eq!(built, parsed);
        assert_eq!(Content::parse(&built.text()).unwrap(), built);
    }

    #[test]
    fn test_request_without_requester() {
        let parsed = Content::parse("REQUEST(Agent[03] DIVINATION Agent[05])").unwrap();
        assert_eq!(parsed.subject(), None);
        assert_eq!(parsed.operands()[0].subject(), Some(agent(3)));
        assert_eq!(parsed.text(), "REQUEST(Agent[03] DIVINATION Agent[05])");
    }

    #[test]
    fn test_nested_request() {
        let text = "REQUEST(REQUEST(VOTE Agent[04]))";
        let parsed = Content::parse(text).unwrap();
        assert_eq!(parsed.operands()[0].operands()[0], Content::vote(agent(4)));
        assert_eq!(parsed.text(), text);
    }

    #[test]
    fn test_because_and_junctions() {
        let because = Content::because(
            Content::divined(agent(2), Species::Werewolf).unwrap(),
            Content::vote(agent(2)),
        );
        assert_eq!(
            because.text(),
            "BECAUSE (DIVINED Agent[02] WEREWOLF) (VOTE Agent[02])"
        );
        assert_eq!(Content::parse(&because.text()).unwrap(), because);

        let and = Content::and(vec![Content::vote(agent(1)), Content::skip()]).unwrap();
        assert_eq!(and.text(), "AND (VOTE Agent[01]) (Skip)");
        assert_eq!(Content::parse(&and.text()).unwrap(), and);

        let or = Content::or(vec![Content::over()]).unwrap();
        assert_eq!(or.text(), "OR (Over)");
        assert_eq!(Content::parse(&or.text()).unwrap(), or);
        assert!(Content::and(Vec::new()).is_err());
    }

    #[test]
    fn test_single_operand_junction_parses() {
        let parsed = Content::parse("AND (VOTE Agent[01])").unwrap();
        assert_eq!(parsed.operator(), Some(Operator::And));
        assert_eq!(parsed.operands(), &[Content::vote(agent(1))]);
        assert_eq!(parsed, Content::and(vec![Content::vote(agent(1))]).unwrap());
        assert_malformed("OR ()");
    }

    #[test]
    fn test_player_builders_reject_index_zero() {
        assert!(matches!(
            Content::estimate(agent(0), Role::Seer),
            Err(ProtocolError::InvalidAgentIndex(0))
        ));
        assert!(Content::comingout(agent(0), Role::Werewolf).is_err());
        assert!(Content::divined(agent(0), Species::Human).is_err());
        assert!(Content::identified(agent(0), Species::Werewolf).is_err());
        assert!(Content::identified(agent(1), Species::Werewolf).is_ok());
    }

    #[test]
    fn test_malformed_inputs() {
        assert_malformed("");
        assert_malformed("   ");
        assert_malformed("HELLO Agent[01]");
        assert_malformed("VOTE");
        assert_malformed("VOTE Agent[01] Agent[02]");
        assert_malformed("VOTE Bob");
        assert_malformed("ESTIMATE Agent00 NOTRAROLE");
        assert_malformed("ESTIMATE Agent[00] SEER");
        assert_malformed("DIVINED Agent[01] VAMPIRE");
        assert_malformed("AGREE TALK day-1 ID:3");
        assert_malformed("AGREE TALK day1 ID:-3");
        assert_malformed("AGREE SHOUT day1 ID:3");
        assert_malformed("AGREE TALK 1 ID:3");
        assert_malformed("REQUEST(VOTE Agent[01]");
        assert_malformed("REQUEST(VOTE Agent[01]) extra");
        assert_malformed("BECAUSE (VOTE Agent[01])");
        assert_malformed("REQUEST(HELLO)");
        assert_malformed("OPERATOR");
    }

    #[test]
    fn test_agent_token_tolerates_formats() {
        assert_eq!(parse_agent_token("Agent[03]"), Some(agent(3)));
        assert_eq!(parse_agent_token("Agent03"), Some(agent(3)));
        assert_eq!(parse_agent_token("Agent[12],"), Some(agent(12)));
        assert_eq!(parse_agent_token("agent[03]"), None);
        assert_eq!(parse_agent_token("Agent[]"), None);
    }
}
