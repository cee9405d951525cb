//! The sans-I/O protocol engine: drives connection lifecycle and query
//! accumulation from parsed frames, without touching a socket itself.
//!
//! The caller (the connection façade) owns the byte stream and the
//! [`crate::protocol::codec::Codec`]; it feeds each parsed `(type_byte,
//! payload)` frame to [`Engine::feed`] and writes whatever lands in the
//! supplied scratch buffer.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::opts::ConnectOpts;
use crate::protocol::backend::{
    AuthenticationMessage, BackendKeyData, ErrorResponse, NoticeResponse, ParameterStatus,
    ReadyForQuery, msg_type,
};
use crate::protocol::backend::extended::{BindComplete, NoData, ParseComplete};
use crate::protocol::backend::query::{CommandComplete, DataRow, EmptyQueryResponse, RowDescription};
use crate::protocol::frontend::{
    md5_password, write_bind, write_describe_portal, write_execute, write_flush, write_parse,
    write_password, write_query, write_startup, write_sync, write_terminate,
};
use crate::protocol::types::TransactionStatus;
use crate::row::{FieldDescriptor, ResultSet, Response};
use crate::value::{Param, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Connecting,
    AwaitingAuth,
    AwaitingStartupReady,
    Idle,
    Busy,
    Closed,
    Fatal,
}

/// What happened as a result of feeding one frame to the engine.
pub enum Event {
    /// More frames are needed before this operation resolves.
    Continue,
    /// The startup handshake reached `ReadyForQuery`.
    StartupComplete,
    /// An `execute` reached `ReadyForQuery`; carries the accumulated
    /// response, or the latched server error in its place.
    QueryComplete(Result<Response>),
}

pub struct Engine {
    state: State,
    user: String,
    password: Option<String>,
    backend_key: Option<BackendKeyData>,
    status_parameters: HashMap<String, String>,
    transaction_status: TransactionStatus,
    response: Response,
    current: Option<ResultSet>,
    current_descriptors: Option<Vec<FieldDescriptor>>,
    latched_error: Option<Error>,
}

impl Engine {
    pub fn new(opts: &ConnectOpts) -> Self {
        Self {
            state: State::Connecting,
            user: opts.user.clone(),
            password: opts.password.clone(),
            backend_key: None,
            status_parameters: HashMap::new(),
            transaction_status: TransactionStatus::Idle,
            response: Response::new(),
            current: None,
            current_descriptors: None,
            latched_error: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.state, State::Fatal | State::Closed)
    }

    /// Force the engine into `Fatal`, e.g. because the caller observed a
    /// transport-level failure the engine itself never saw a frame for.
    pub(crate) fn mark_fatal(&mut self) {
        if self.state != State::Closed {
            self.state = State::Fatal;
        }
    }

    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    pub fn status_parameters(&self) -> &HashMap<String, String> {
        &self.status_parameters
    }

    pub fn backend_key(&self) -> Option<&BackendKeyData> {
        self.backend_key.as_ref()
    }

    /// Write the `StartupMessage`, entering `AwaitingAuth`.
    pub fn start_startup(&mut self, opts: &ConnectOpts, out: &mut Vec<u8>) {
        let mut params: Vec<(&str, &str)> = vec![("user", &opts.user), ("client_encoding", "UTF8"), ("DateStyle", "ISO")];
        if let Some(db) = &opts.database {
            params.push(("database", db));
        }
        if let Some(app) = opts.application_name.as_deref().filter(|s| !s.is_empty()) {
            params.push(("application_name", app));
        } else if !opts.fallback_application_name.is_empty() {
            params.push(("application_name", &opts.fallback_application_name));
        }

        write_startup(out, &params);
        self.state = State::AwaitingAuth;
    }

    /// Write the request for one `execute` call, entering `Busy`.
    ///
    /// `params` of `None` selects the simple query path; `Some` (even an
    /// empty slice) selects the extended pipeline.
    pub fn start_execute(&mut self, query: &str, params: Option<&[Param]>, out: &mut Vec<u8>) -> Result<()> {
        if self.state != State::Idle {
            return Err(Error::InvalidUsage("execute called while connection is not idle".into()));
        }

        self.response = Response::new();
        self.current = None;
        self.current_descriptors = None;
        self.latched_error = None;

        match params {
            None => write_query(out, query),
            Some(params) => {
                write_parse(out, query, params);
                write_bind(out, params);
                write_describe_portal(out);
                write_execute(out);
                write_flush(out);
                write_sync(out);
            }
        }

        self.state = State::Busy;
        Ok(())
    }

    /// Write `Terminate`. The caller should close the stream right after.
    pub fn start_close(&mut self, out: &mut Vec<u8>) {
        write_terminate(out);
        self.state = State::Closed;
    }

    /// Feed one parsed frame to the engine.
    ///
    /// Any `Err` returned here — whether from an explicit protocol-violation
    /// check below or from a parser's `?` inside one of the `feed_*` helpers
    /// — moves the engine to `Fatal`. A malformed frame is always a wire
    /// contract violation, regardless of which line detected it.
    pub fn feed(&mut self, type_byte: u8, payload: &[u8], out: &mut Vec<u8>) -> Result<Event> {
        let result = match self.state {
            State::AwaitingAuth => self.feed_auth(type_byte, payload, out),
            State::AwaitingStartupReady => self.feed_startup_ready(type_byte, payload),
            State::Busy => self.feed_busy(type_byte, payload),
            State::Connecting | State::Idle | State::Closed | State::Fatal => {
                self.fatal(format!("unexpected message '{}' in state {:?}", type_byte as char, self.state))
            }
        };
        if result.is_err() {
            self.mark_fatal();
        }
        result
    }

    fn fatal<T>(&mut self, message: String) -> Result<T> {
        self.state = State::Fatal;
        Err(Error::Protocol(message))
    }

    fn feed_auth(&mut self, type_byte: u8, payload: &[u8], out: &mut Vec<u8>) -> Result<Event> {
        if type_byte != msg_type::AUTHENTICATION {
            return self.fatal(format!("expected Authentication, got '{}'", type_byte as char));
        }

        match AuthenticationMessage::parse(payload)? {
            AuthenticationMessage::Ok => {
                self.state = State::AwaitingStartupReady;
                Ok(Event::Continue)
            }
            AuthenticationMessage::Md5Password { salt } => {
                let Some(password) = self.password.as_deref() else {
                    return self.fatal("server requires MD5 authentication but no password was provided".into());
                };
                let hashed = md5_password(&self.user, password, &salt);
                write_password(out, &hashed);
                Ok(Event::Continue)
            }
            AuthenticationMessage::Other(code) => {
                self.fatal(format!("unsupported authentication method {code}"))
            }
        }
    }

    fn feed_startup_ready(&mut self, type_byte: u8, payload: &[u8]) -> Result<Event> {
        match type_byte {
            msg_type::BACKEND_KEY_DATA => {
                self.backend_key = Some(*BackendKeyData::parse(payload)?);
                Ok(Event::Continue)
            }
            msg_type::PARAMETER_STATUS => {
                self.record_parameter_status(payload)?;
                Ok(Event::Continue)
            }
            msg_type::NOTICE_RESPONSE => {
                self.record_notice(payload)?;
                Ok(Event::Continue)
            }
            msg_type::READY_FOR_QUERY => {
                self.apply_ready_for_query(payload)?;
                self.password = None;
                self.state = State::Idle;
                Ok(Event::StartupComplete)
            }
            _ => self.fatal(format!("unexpected message '{}' during startup", type_byte as char)),
        }
    }

    fn feed_busy(&mut self, type_byte: u8, payload: &[u8]) -> Result<Event> {
        match type_byte {
            msg_type::ROW_DESCRIPTION => {
                let desc = RowDescription::parse(payload)?;
                let descriptors: Vec<FieldDescriptor> =
                    desc.fields().iter().map(FieldDescriptor::from_wire).collect();
                self.current_descriptors = Some(descriptors.clone());
                self.current = Some(ResultSet { descriptors: Some(descriptors), rows: Some(Vec::new()), command_status: None });
                Ok(Event::Continue)
            }
            msg_type::DATA_ROW => {
                self.record_data_row(payload)?;
                Ok(Event::Continue)
            }
            msg_type::COMMAND_COMPLETE => {
                let complete = CommandComplete::parse(payload)?;
                let mut result_set = self.current.take().unwrap_or_else(ResultSet::new);
                result_set.command_status = Some(complete.tag.to_string());
                self.response.0.push(result_set);
                self.current_descriptors = None;
                Ok(Event::Continue)
            }
            msg_type::EMPTY_QUERY_RESPONSE => {
                EmptyQueryResponse::parse(payload)?;
                self.response.0.push(ResultSet { descriptors: None, rows: None, command_status: Some(String::new()) });
                Ok(Event::Continue)
            }
            msg_type::PARSE_COMPLETE => {
                ParseComplete::parse(payload)?;
                Ok(Event::Continue)
            }
            msg_type::BIND_COMPLETE => {
                BindComplete::parse(payload)?;
                Ok(Event::Continue)
            }
            msg_type::NO_DATA => {
                NoData::parse(payload)?;
                Ok(Event::Continue)
            }
            msg_type::PARAMETER_STATUS => {
                self.record_parameter_status(payload)?;
                Ok(Event::Continue)
            }
            msg_type::NOTICE_RESPONSE => {
                self.record_notice(payload)?;
                Ok(Event::Continue)
            }
            msg_type::ERROR_RESPONSE => {
                let error = ErrorResponse::parse(payload)?;
                self.latched_error = Some(error.into_error());
                Ok(Event::Continue)
            }
            msg_type::READY_FOR_QUERY => {
                self.apply_ready_for_query(payload)?;
                self.state = State::Idle;
                self.current = None;
                self.current_descriptors = None;
                match self.latched_error.take() {
                    Some(error) => Ok(Event::QueryComplete(Err(error))),
                    None => Ok(Event::QueryComplete(Ok(std::mem::replace(&mut self.response, Response::new())))),
                }
            }
            _ => self.fatal(format!("unexpected message '{}' while busy", type_byte as char)),
        }
    }

    fn record_data_row(&mut self, payload: &[u8]) -> Result<()> {
        let descriptors = self
            .current_descriptors
            .as_ref()
            .ok_or_else(|| Error::Protocol("DataRow received with no preceding RowDescription".into()))?;
        let data_row = DataRow::parse(payload)?;
        if data_row.len() != descriptors.len() {
            return Err(Error::Protocol(format!(
                "DataRow has {} columns but RowDescription declared {}",
                data_row.len(),
                descriptors.len()
            )));
        }

        let mut values = Vec::with_capacity(descriptors.len());
        for (field, column) in descriptors.iter().zip(data_row.iter()) {
            let bytes = column?;
            values.push(Value::decode(field.type_oid, field.format, bytes)?);
        }

        let result_set = self.current.get_or_insert_with(ResultSet::new);
        result_set.rows.get_or_insert_with(Vec::new).push(crate::row::Row(values));
        Ok(())
    }

    fn record_parameter_status(&mut self, payload: &[u8]) -> Result<()> {
        let status = ParameterStatus::parse(payload)?;
        self.status_parameters.insert(status.name.to_string(), status.value.to_string());
        Ok(())
    }

    fn record_notice(&mut self, payload: &[u8]) -> Result<()> {
        let notice = NoticeResponse::parse(payload)?;
        warn!(message = notice.0.message(), severity = notice.0.severity(), "server notice");
        Ok(())
    }

    fn apply_ready_for_query(&mut self, payload: &[u8]) -> Result<()> {
        let ready = ReadyForQuery::parse(payload)?;
        match ready.transaction_status() {
            Some(status) => {
                self.transaction_status = status;
                Ok(())
            }
            None => {
                let byte = ready.status;
                debug!(byte, "unrecognized transaction status byte");
                Err(Error::Protocol(format!("unrecognized transaction status byte '{}'", byte as char)))
            }
        }
    }
}
