use std::fmt;

use crate::constants::REASON_SEPARATOR;

/// Outcome classification of a configuration mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultCode {
    #[default]
    Success,
    OperationsError,
    ConstraintViolation,
    InvalidAttributeSyntax,
    NoSuchObject,
    EntryAlreadyExists,
    NotAllowedOnNonLeaf,
    UnwillingToPerform,
    Other,
}

impl ResultCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success)
    }

    /// LDAP numeric value of the code.
    pub fn int_value(&self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::OperationsError => 1,
            ResultCode::ConstraintViolation => 19,
            ResultCode::InvalidAttributeSyntax => 21,
            ResultCode::NoSuchObject => 32,
            ResultCode::UnwillingToPerform => 53,
            ResultCode::NotAllowedOnNonLeaf => 66,
            ResultCode::EntryAlreadyExists => 68,
            ResultCode::Other => 80,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            ResultCode::Success => "Success",
            ResultCode::OperationsError => "Operations Error",
            ResultCode::ConstraintViolation => "Constraint Violation",
            ResultCode::InvalidAttributeSyntax => "Invalid Attribute Syntax",
            ResultCode::NoSuchObject => "No Such Entry",
            ResultCode::EntryAlreadyExists => "Entry Already Exists",
            ResultCode::NotAllowedOnNonLeaf => "Not Allowed on Non-Leaf",
            ResultCode::UnwillingToPerform => "Unwilling to Perform",
            ResultCode::Other => "Other",
        };
        write!(f, "{} ({})", name, self.int_value())
    }
}

/// Outcome of an accept or apply step.
///
/// The default value is an empty success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigChangeResult {
    result_code: ResultCode,
    admin_action_required: bool,
    messages: Vec<String>,
}

impl ConfigChangeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure(
        result_code: ResultCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            result_code,
            admin_action_required: false,
            messages: vec![message.into()],
        }
    }

    pub fn result_code(&self) -> ResultCode {
        self.result_code
    }

    pub fn set_result_code(
        &mut self,
        result_code: ResultCode,
    ) {
        self.result_code = result_code;
    }

    /// Sets the code only while the result is still a success.
    pub fn set_result_code_if_success(
        &mut self,
        result_code: ResultCode,
    ) {
        if self.result_code.is_success() {
            self.result_code = result_code;
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code.is_success()
    }

    pub fn admin_action_required(&self) -> bool {
        self.admin_action_required
    }

    pub fn set_admin_action_required(
        &mut self,
        required: bool,
    ) {
        self.admin_action_required = required;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn add_message(
        &mut self,
        message: impl Into<String>,
    ) {
        self.messages.push(message.into());
    }

    /// Merges another result into this one.
    ///
    /// The first failure aggregated decides the code; every failure's messages
    /// are kept, in order. Successful results contribute no messages.
    pub fn aggregate(
        &mut self,
        other: &ConfigChangeResult,
    ) {
        self.admin_action_required |= other.admin_action_required;
        if !other.result_code.is_success() {
            self.set_result_code_if_success(other.result_code);
            self.messages.extend(other.messages.iter().cloned());
        }
    }
}

impl fmt::Display for ConfigChangeResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "ConfigChangeResult(result_code={}, admin_action_required={}, messages={:?})",
            self.result_code, self.admin_action_required, self.messages
        )
    }
}

/// Accept-phase reason sink.
///
/// Each listener or handler message is kept separately and rendered joined
/// by a double space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnacceptableReasons {
    messages: Vec<String>,
}

impl UnacceptableReasons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        message: impl Into<String>,
    ) {
        let message = message.into();
        if !message.is_empty() {
            self.messages.push(message);
        }
    }

    pub fn extend<I, S>(
        &mut self,
        messages: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for UnacceptableReasons {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.messages.join(REASON_SEPARATOR))
    }
}
