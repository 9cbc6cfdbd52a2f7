//! Top-level program: the list of global atoms.

use serde::{Deserialize, Serialize};

use super::api::Api;
use super::expr::{Identifier, IdentifierRef};
use super::model::Model;
use super::populator::Populator;
use super::validator::Validator;
use crate::foundation::Span;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub globals: Vec<GlobalAtom>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlobalAtom {
    Model(Model),
    Validator(Validator),
    Api(Api),
    Populator(Populator),
    Runtime(Runtime),
    Auth(Authenticator),
    Generator(Generator),
}

impl Program {
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.globals.iter().filter_map(|g| match g {
            GlobalAtom::Model(model) => Some(model),
            _ => None,
        })
    }

    pub fn apis(&self) -> impl Iterator<Item = &Api> {
        self.globals.iter().filter_map(|g| match g {
            GlobalAtom::Api(api) => Some(api),
            _ => None,
        })
    }

    pub fn runtimes(&self) -> impl Iterator<Item = &Runtime> {
        self.globals.iter().filter_map(|g| match g {
            GlobalAtom::Runtime(runtime) => Some(runtime),
            _ => None,
        })
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.globals.iter().filter_map(|g| match g {
            GlobalAtom::Validator(validator) => Some(validator),
            _ => None,
        })
    }

    pub fn auth(&self) -> Option<&Authenticator> {
        self.globals.iter().find_map(|g| match g {
            GlobalAtom::Auth(auth) => Some(auth),
            _ => None,
        })
    }
}

/// `runtime Node { default; source path "./hooks" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    pub name: Identifier,
    pub default: bool,
    pub source_path: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Basic,
}

/// `auth { model User; method basic }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authenticator {
    pub model: IdentifierRef,
    pub method: AuthMethod,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientTarget {
    Js,
    Ts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Generator {
    /// `generate client { target ts; api Public; output "./client" }`
    Client {
        target: ClientTarget,
        api: Option<Identifier>,
        output: Option<String>,
        span: Span,
    },
    /// `generate apidocs { basePath "/docs" }`
    ApiDocs { base_path: Option<String>, span: Span },
}
