//! Symbolic enums shared by the grammar and the wire format.
//!
//! Every enum serializes as its upper-case symbolic name and parses
//! case-insensitively from utterance text.

use serde::{Deserialize, Serialize};

macro_rules! symbolic {
    ($(#[$meta:meta])* pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            strum::Display,
            strum::EnumString,
            strum::AsRefStr,
            strum::EnumIter,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }
    };
}

symbolic! {
    /// Side a role wins with.
    pub enum Team {
        Villager,
        Werewolf,
        Others,
        Any,
    }
}

symbolic! {
    /// Result of a divination or an inquest.
    pub enum Species {
        Human,
        Werewolf,
        Any,
    }
}

symbolic! {
    pub enum Role {
        Villager,
        Seer,
        Medium,
        Bodyguard,
        Possessed,
        Werewolf,
        Freemason,
        Fox,
        Any,
    }
}

impl Role {
    pub fn team(self) -> Team {
        match self {
            Role::Villager | Role::Seer | Role::Medium | Role::Bodyguard | Role::Freemason => {
                Team::Villager
            }
            Role::Possessed | Role::Werewolf => Team::Werewolf,
            Role::Fox => Team::Others,
            Role::Any => Team::Any,
        }
    }

    /// What a seer sees when divining an agent with this role.
    pub fn species(self) -> Species {
        match self {
            Role::Werewolf => Species::Werewolf,
            Role::Any => Species::Any,
            _ => Species::Human,
        }
    }
}

symbolic! {
    pub enum Status {
        Alive,
        Dead,
    }
}

symbolic! {
    /// Channel an utterance was spoken on.
    pub enum TalkType {
        Talk,
        Whisper,
    }
}

symbolic! {
    pub enum Topic {
        #[strum(serialize = "Skip")]
        Skip,
        #[strum(serialize = "Over")]
        Over,
        Estimate,
        Comingout,
        Divination,
        Divined,
        Identified,
        Guard,
        Guarded,
        Vote,
        Attack,
        Agree,
        Disagree,
        Operator,
    }
}

impl Topic {
    /// Number of tokens a simple statement of this topic spans, subject excluded.
    ///
    /// `None` for `Operator`, whose operands are parenthesized statements.
    pub fn arity(self) -> Option<usize> {
        match self {
            Topic::Skip | Topic::Over => Some(1),
            Topic::Attack | Topic::Guarded | Topic::Vote | Topic::Divination | Topic::Guard => {
                Some(2)
            }
            Topic::Estimate | Topic::Comingout | Topic::Divined | Topic::Identified => Some(3),
            Topic::Agree | Topic::Disagree => Some(4),
            Topic::Operator => None,
        }
    }
}

symbolic! {
    pub enum Operator {
        Request,
        Because,
        And,
        Or,
    }
}

symbolic! {
    /// Kind of request the arbiter sends in each packet.
    pub enum Request {
        Initialize,
        DailyInitialize,
        DailyFinish,
        Name,
        Role,
        Talk,
        Whisper,
        Vote,
        Attack,
        Divine,
        Guard,
        Finish,
    }
}

impl Request {
    /// Whether the arbiter waits for a reply line.
    pub fn expects_reply(self) -> bool {
        !matches!(
            self,
            Request::Initialize | Request::DailyInitialize | Request::DailyFinish | Request::Finish
        )
    }
}
