use crate::types::{ActionId, Tick};

#[derive(Clone, Debug)]
pub struct ActionEnvelope<A> {
    pub action_id: ActionId,
    pub intended_tick: Tick,
    pub payload: A,
}
