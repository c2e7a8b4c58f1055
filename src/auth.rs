use crate::election::VoterId;

/// Answers the single authorization question the engine asks: is this caller
/// the administrator? Injected at construction so tests and adapters can
/// swap policies without touching the engine.
pub trait AdminGate {
    fn is_admin(&self, caller: &VoterId) -> bool;
}

/// One fixed administrator identity, established when the election is set up.
#[derive(Debug, Clone)]
pub struct SingleAdmin {
    admin: VoterId,
}

impl SingleAdmin {
    pub fn new(admin: impl Into<VoterId>) -> Self {
        SingleAdmin {
            admin: admin.into(),
        }
    }

    pub fn admin(&self) -> &VoterId {
        &self.admin
    }
}

impl AdminGate for SingleAdmin {
    fn is_admin(&self, caller: &VoterId) -> bool {
        *caller == self.admin
    }
}
