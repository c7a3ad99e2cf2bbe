//! `PulseAudio` backend built on `libpulse`'s standard (blocking) main loop.
//!
//! Each [`PulseConnection`] owns its own main loop and context, so it must
//! stay on the thread that created it. Requests are issued asynchronously by
//! `libpulse` and completed here by iterating the main loop until the
//! operation leaves the `Running` state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use libpulse_binding as pulse;
use pulse::callbacks::ListResult;
use pulse::context::introspect::SinkInfo as PaSinkInfo;
use pulse::context::subscribe::{
    Facility as PaFacility, InterestMaskSet, Operation as PaSubscribeOperation,
};
use pulse::context::{Context, FlagSet, State};
use pulse::error::PAErr;
use pulse::mainloop::standard::{IterateResult, Mainloop};
use pulse::operation::{Operation, State as OperationState};

use super::{
    Connector, EventHandler, EventKind, Facility, ServerConnection, ServerEvent, SinkId, SinkInfo,
    StreamId,
};
use crate::ServerError;

/// Connects to the `PulseAudio` (or `pipewire-pulse`) server.
#[derive(Debug, Clone, Default)]
pub struct PulseConnector {
    server: Option<String>,
}

impl PulseConnector {
    /// Creates a connector for the default server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector for an explicit server address, e.g.
    /// `unix:/run/user/1000/pulse/native`.
    pub fn with_server(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
        }
    }
}

impl Connector for PulseConnector {
    fn connect(&self, client_name: &str) -> Result<Box<dyn ServerConnection>, ServerError> {
        Ok(Box::new(PulseConnection::open(
            self.server.as_deref(),
            client_name,
        )?))
    }

    fn name(&self) -> &'static str {
        "PulseAudio"
    }
}

/// One `libpulse` context with its own main loop.
struct PulseConnection {
    // Declared before the main loop so it is dropped first
    context: Context,
    mainloop: Mainloop,
}

impl PulseConnection {
    fn open(server: Option<&str>, client_name: &str) -> Result<Self, ServerError> {
        let mainloop =
            Mainloop::new().ok_or_else(|| ServerError::connection("failed to create main loop"))?;
        let mut context = Context::new(&mainloop, client_name)
            .ok_or_else(|| ServerError::connection("failed to create context"))?;

        context
            .connect(server, FlagSet::NOFLAGS, None)
            .map_err(|e| ServerError::connection(describe(e)))?;

        let mut connection = Self { context, mainloop };
        connection.wait_until_ready()?;

        tracing::debug!(client = client_name, "connected to PulseAudio");
        Ok(connection)
    }

    fn wait_until_ready(&mut self) -> Result<(), ServerError> {
        loop {
            self.iterate()
                .map_err(|e| ServerError::connection(e.to_string()))?;

            match self.context.get_state() {
                State::Ready => return Ok(()),
                State::Failed | State::Terminated => {
                    return Err(ServerError::connection(describe(self.context.errno())));
                }
                _ => {}
            }
        }
    }

    /// Runs one blocking main loop iteration.
    fn iterate(&mut self) -> Result<(), ServerError> {
        match self.mainloop.iterate(true) {
            IterateResult::Success(_) => Ok(()),
            IterateResult::Quit(_) => Err(ServerError::disconnected("main loop quit")),
            IterateResult::Err(e) => Err(ServerError::disconnected(describe(e))),
        }
    }

    /// Fails if the context is no longer usable.
    fn check_context(&self) -> Result<(), ServerError> {
        match self.context.get_state() {
            State::Failed | State::Terminated => {
                Err(ServerError::disconnected(describe(self.context.errno())))
            }
            _ => Ok(()),
        }
    }

    /// Iterates the main loop until `operation` completes.
    fn wait_for<F: ?Sized>(&mut self, operation: &Operation<F>) -> Result<(), ServerError> {
        while operation.get_state() == OperationState::Running {
            self.iterate()?;
            self.check_context()?;
        }

        if operation.get_state() == OperationState::Cancelled {
            return Err(ServerError::operation("operation cancelled"));
        }
        Ok(())
    }

    fn last_error(&self) -> ServerError {
        ServerError::operation(describe(self.context.errno()))
    }
}

impl ServerConnection for PulseConnection {
    fn list_sinks(&mut self) -> Result<Vec<SinkInfo>, ServerError> {
        let sinks = Rc::new(RefCell::new(Vec::new()));
        let failed = Rc::new(Cell::new(false));

        let operation = {
            let sinks = Rc::clone(&sinks);
            let failed = Rc::clone(&failed);
            self.context
                .introspect()
                .get_sink_info_list(move |result: ListResult<&PaSinkInfo>| match result {
                    ListResult::Item(info) => sinks.borrow_mut().push(SinkInfo {
                        id: SinkId::new(info.index),
                        name: info
                            .name
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                    }),
                    ListResult::End => {}
                    ListResult::Error => failed.set(true),
                })
        };
        self.wait_for(&operation)?;

        if failed.get() {
            return Err(self.last_error());
        }
        Ok(sinks.take())
    }

    fn move_sink_input(&mut self, stream: StreamId, sink: SinkId) -> Result<(), ServerError> {
        let outcome = Rc::new(Cell::new(None));

        let operation = {
            let outcome = Rc::clone(&outcome);
            self.context.introspect().move_sink_input_by_index(
                stream.index(),
                sink.index(),
                Some(Box::new(move |success: bool| outcome.set(Some(success)))),
            )
        };
        self.wait_for(&operation)?;

        match outcome.get() {
            Some(true) => Ok(()),
            _ => Err(self.last_error()),
        }
    }

    fn set_event_handler(&mut self, mut handler: EventHandler) {
        self.context.set_subscribe_callback(Some(Box::new(
            move |facility: Option<PaFacility>, operation: Option<PaSubscribeOperation>, index: u32| {
                let (Some(facility), Some(operation)) = (facility, operation) else {
                    return;
                };
                handler(ServerEvent::new(
                    facility_from_pulse(facility),
                    kind_from_pulse(operation),
                    index,
                ));
            },
        )));
    }

    fn subscribe(&mut self, facilities: &[Facility]) -> Result<(), ServerError> {
        let mask = facilities
            .iter()
            .fold(InterestMaskSet::empty(), |mask, facility| {
                mask | interest_for(*facility)
            });
        let outcome = Rc::new(Cell::new(None));

        let operation = {
            let outcome = Rc::clone(&outcome);
            self.context
                .subscribe(mask, move |success: bool| outcome.set(Some(success)))
        };
        self.wait_for(&operation)?;

        match outcome.get() {
            Some(true) => Ok(()),
            _ => Err(self.last_error()),
        }
    }

    fn run_event_loop(&mut self) -> Result<(), ServerError> {
        loop {
            self.iterate()?;
            self.check_context()?;
        }
    }
}

impl Drop for PulseConnection {
    fn drop(&mut self) {
        self.context.disconnect();
    }
}

fn describe(err: PAErr) -> String {
    format!("{err}")
}

fn interest_for(facility: Facility) -> InterestMaskSet {
    match facility {
        Facility::Sink => InterestMaskSet::SINK,
        Facility::Source => InterestMaskSet::SOURCE,
        Facility::SinkInput => InterestMaskSet::SINK_INPUT,
        Facility::SourceOutput => InterestMaskSet::SOURCE_OUTPUT,
        Facility::Module => InterestMaskSet::MODULE,
        Facility::Client => InterestMaskSet::CLIENT,
        Facility::SampleCache => InterestMaskSet::SAMPLE_CACHE,
        Facility::Server => InterestMaskSet::SERVER,
        Facility::Card => InterestMaskSet::CARD,
    }
}

fn facility_from_pulse(facility: PaFacility) -> Facility {
    match facility {
        PaFacility::Sink => Facility::Sink,
        PaFacility::Source => Facility::Source,
        PaFacility::SinkInput => Facility::SinkInput,
        PaFacility::SourceOutput => Facility::SourceOutput,
        PaFacility::Module => Facility::Module,
        PaFacility::Client => Facility::Client,
        PaFacility::SampleCache => Facility::SampleCache,
        PaFacility::Server => Facility::Server,
        PaFacility::Card => Facility::Card,
    }
}

fn kind_from_pulse(operation: PaSubscribeOperation) -> EventKind {
    match operation {
        PaSubscribeOperation::New => EventKind::New,
        PaSubscribeOperation::Changed => EventKind::Change,
        PaSubscribeOperation::Removed => EventKind::Remove,
    }
}
