use crate::infrastructure::in_memory::LedgerState;
use std::io::Write;

/// Writes the final account summary as CSV:
/// `kind,handle,balance,float,commission`, users first (by phone), then
/// agents (by code).
pub struct SummaryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_summary(&mut self, state: &LedgerState) -> Result<(), csv::Error> {
        self.writer
            .write_record(["kind", "handle", "balance", "float", "commission"])?;

        let agent_user_ids: Vec<_> = state.agents.values().map(|a| a.user_id).collect();

        let mut users: Vec<_> = state
            .users
            .values()
            .filter(|u| !agent_user_ids.contains(&u.id))
            .collect();
        users.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));
        for user in users {
            self.writer.write_record([
                "user",
                &user.phone_number,
                &user.balance.to_string(),
                "",
                "",
            ])?;
        }

        let mut agents: Vec<_> = state.agents.values().collect();
        agents.sort_by(|a, b| a.agent_code.cmp(&b.agent_code));
        for agent in agents {
            self.writer.write_record([
                "agent",
                &agent.agent_code,
                "",
                &agent.float_balance.to_string(),
                &agent.commission_balance.to_string(),
            ])?;
        }

        self.writer.flush()?;
        Ok(())
    }
}
