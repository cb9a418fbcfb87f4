//! Command boundary in front of the coordinator
//!
//! External callers speak [`CoordCommand`]s; the [`CommandService`] builds
//! collaborators through the catalog and forwards to the coordinator. Every
//! command gets a [`CoordReply`], failures included.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ConditionTestDescriptor, ControlLawDescriptor};
use crate::condition::FlagHandle;
use crate::coordinator::{Coordinator, StatusSnapshot};
use crate::domain::{LawId, Status, TestId};

/// Requests accepted by the command service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoordCommand {
    /// Build, register and start a control law
    RegisterControlLaw { law: ControlLawDescriptor },

    DestroyControlLaw { id: LawId },

    /// Build and register a condition test
    RegisterConditionTest { test: ConditionTestDescriptor },

    DestroyConditionTest { id: TestId },

    /// Stop `law_id` with `status` once `test_id` fires
    RegisterTerminationCondition { test_id: TestId, law_id: LawId, status: Status },

    /// Set the flags inside a registered test; all of them unless `label` picks one
    SetFlag {
        test_id: TestId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        value: bool,
    },

    GetStatus,
}

/// Replies from the command service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoordReply {
    LawRegistered { id: LawId },

    TestRegistered { id: TestId },

    Destroyed { removed: bool },

    /// Acknowledgment
    Ok,

    Status { snapshot: StatusSnapshot },

    Error { message: String },
}

impl CoordReply {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Executes [`CoordCommand`]s against one coordinator
pub struct CommandService {
    coordinator: Arc<Coordinator>,
    catalog: Catalog,
    flags: Mutex<HashMap<TestId, Vec<FlagHandle>>>,
}

impl CommandService {
    pub fn new(coordinator: Arc<Coordinator>, catalog: Catalog) -> Self {
        debug!("CommandService::new: called");
        Self {
            coordinator,
            catalog,
            flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn execute(&self, command: CoordCommand) -> CoordReply {
        debug!(?command, "CommandService::execute: called");
        match command {
            CoordCommand::RegisterControlLaw { law } => match self.catalog.build_control_law(&law) {
                Ok(law) => CoordReply::LawRegistered {
                    id: self.coordinator.register_control_law(law),
                },
                Err(e) => {
                    warn!(name = %law.name, error = %e, "Rejected control law");
                    CoordReply::error(e.to_string())
                }
            },
            CoordCommand::DestroyControlLaw { id } => CoordReply::Destroyed {
                removed: self.coordinator.destroy_control_law(id),
            },
            CoordCommand::RegisterConditionTest { test } => match self.catalog.build_condition_test(&test) {
                Ok(built) => {
                    let id = self.coordinator.register_condition_test(built.test);
                    if !built.flags.is_empty() {
                        self.flags.lock().insert(id, built.flags);
                    }
                    CoordReply::TestRegistered { id }
                }
                Err(e) => {
                    warn!(name = %test.name, error = %e, "Rejected condition test");
                    CoordReply::error(e.to_string())
                }
            },
            CoordCommand::DestroyConditionTest { id } => {
                let removed = self.coordinator.destroy_condition_test(id);
                self.flags.lock().remove(&id);
                CoordReply::Destroyed { removed }
            }
            CoordCommand::RegisterTerminationCondition {
                test_id,
                law_id,
                status,
            } => {
                self.coordinator.register_termination_condition(test_id, law_id, status);
                CoordReply::Ok
            }
            CoordCommand::SetFlag { test_id, label, value } => self.set_flag(test_id, label.as_deref(), value),
            CoordCommand::GetStatus => CoordReply::Status {
                snapshot: self.coordinator.snapshot(),
            },
        }
    }

    fn set_flag(&self, test_id: TestId, label: Option<&str>, value: bool) -> CoordReply {
        let flags = self.flags.lock();
        let Some(handles) = flags.get(&test_id) else {
            return CoordReply::error(format!("{} has no flags", test_id));
        };

        let mut set = 0;
        for handle in handles.iter().filter(|h| label.is_none_or(|l| h.label() == l)) {
            handle.set(value);
            set += 1;
        }

        if set == 0 {
            return CoordReply::error(format!("{} has no flag labeled {}", test_id, label.unwrap_or_default()));
        }
        info!(%test_id, ?label, value, "Flag set");
        CoordReply::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CoordinatorConfig, TracingPublisher};
    use crate::domain::Parameters;
    use crate::robot::{RobotConfig, RobotIo};

    fn service() -> CommandService {
        let coordinator = Arc::new(Coordinator::new(CoordinatorConfig::default(), Arc::new(TracingPublisher)));
        CommandService::new(coordinator, Catalog::new(RobotIo::default(), RobotConfig::default()))
    }

    fn flag(label: &str) -> CoordCommand {
        CoordCommand::RegisterConditionTest {
            test: ConditionTestDescriptor::new("flag", Parameters::new().with("label", label)),
        }
    }

    #[test]
    fn test_command_serialize() {
        let cmd = CoordCommand::DestroyControlLaw { id: LawId::new(3) };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"type":"DestroyControlLaw","id":3}"#);

        let json = serde_json::to_string(&CoordCommand::GetStatus).unwrap();
        assert_eq!(json, r#"{"type":"GetStatus"}"#);
    }

    #[test]
    fn test_command_deserialize() {
        let json = r#"{"type":"RegisterTerminationCondition","test_id":1,"law_id":0,"status":"SUCCESS"}"#;
        let cmd: CoordCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            CoordCommand::RegisterTerminationCondition {
                test_id: TestId::new(1),
                law_id: LawId::new(0),
                status: Status::Success,
            }
        );

        let json = r#"{"type":"SetFlag","test_id":2,"value":true}"#;
        let cmd: CoordCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            CoordCommand::SetFlag {
                test_id: TestId::new(2),
                label: None,
                value: true,
            }
        );
    }

    #[test]
    fn test_reply_serialize() {
        let json = serde_json::to_string(&CoordReply::Destroyed { removed: false }).unwrap();
        assert_eq!(json, r#"{"type":"Destroyed","removed":false}"#);
        let json = serde_json::to_string(&CoordReply::Ok).unwrap();
        assert_eq!(json, r#"{"type":"Ok"}"#);
    }

    #[test]
    fn test_flag_terminates_law() {
        let service = service();
        let CoordReply::TestRegistered { id: test_id } = service.execute(flag("DoorSeen")) else {
            panic!("expected TestRegistered");
        };
        let law = CoordCommand::RegisterControlLaw {
            law: ControlLawDescriptor::new("drive", Parameters::new().with("speed", 0.3)),
        };
        let CoordReply::LawRegistered { id: law_id } = service.execute(law) else {
            panic!("expected LawRegistered");
        };
        assert_eq!(
            service.execute(CoordCommand::RegisterTerminationCondition {
                test_id,
                law_id,
                status: Status::Success,
            }),
            CoordReply::Ok
        );

        let reply = service.execute(CoordCommand::SetFlag {
            test_id,
            label: Some("DoorSeen".to_string()),
            value: true,
        });
        assert_eq!(reply, CoordReply::Ok);

        service.coordinator().tick();
        let CoordReply::Status { snapshot } = service.execute(CoordCommand::GetStatus) else {
            panic!("expected Status");
        };
        assert_eq!(snapshot.status_of(law_id), Some(Status::Success));
    }

    #[test]
    fn test_catalog_errors_become_replies() {
        let service = service();
        let reply = service.execute(CoordCommand::RegisterControlLaw {
            law: ControlLawDescriptor::new("hover", Parameters::new()),
        });
        assert!(reply.is_error());
        assert!(service.coordinator().control_law_ids().is_empty());
    }

    #[test]
    fn test_set_flag_errors() {
        let service = service();
        let reply = service.execute(CoordCommand::SetFlag {
            test_id: TestId::new(0),
            label: None,
            value: true,
        });
        assert!(reply.is_error());

        service.execute(flag("A"));
        let reply = service.execute(CoordCommand::SetFlag {
            test_id: TestId::new(0),
            label: Some("B".to_string()),
            value: true,
        });
        assert!(reply.is_error());
    }

    #[test]
    fn test_destroy_replies() {
        let service = service();
        service.execute(flag("A"));
        assert_eq!(
            service.execute(CoordCommand::DestroyConditionTest { id: TestId::new(0) }),
            CoordReply::Destroyed { removed: true }
        );
        assert_eq!(
            service.execute(CoordCommand::DestroyControlLaw { id: LawId::new(5) }),
            CoordReply::Destroyed { removed: false }
        );
        let reply = service.execute(CoordCommand::SetFlag {
            test_id: TestId::new(0),
            label: None,
            value: true,
        });
        assert!(reply.is_error(), "flags go with their test");
    }
}
