use tracing::info;
use uuid::Uuid;

use nt_types::models::{ConnectionRequest, HANDSHAKE_COST, RequestStatus, TxKind};

use crate::models::{NewRequest, ProtocolState};
use crate::{Database, Result, StoreError};

impl Database {
    /// Send a handshake request to a tag. The sender must be able to cover
    /// the handshake fee now; the fee itself is only charged on acceptance.
    pub fn send_request(&self, new_request: NewRequest) -> Result<ConnectionRequest> {
        if new_request.reason.trim().is_empty() {
            return Err(StoreError::Validation("a pitch is required".to_string()));
        }

        self.mutate(|state| {
            let sender = state
                .user_by_name(&new_request.sender_name)
                .ok_or_else(|| StoreError::not_found("user", new_request.sender_name.as_str()))?;
            if sender.coins < HANDSHAKE_COST {
                return Err(StoreError::InsufficientBalance {
                    required: HANDSHAKE_COST,
                    available: sender.coins,
                });
            }

            let tag = state
                .tag(&new_request.tag_id)
                .ok_or_else(|| StoreError::not_found("tag", new_request.tag_id.as_str()))?;
            if tag.owner == new_request.sender_name {
                return Err(StoreError::Validation(
                    "cannot request a handshake with your own tag".to_string(),
                ));
            }
            let already_pending = state.requests.iter().any(|r| {
                r.tag_id == new_request.tag_id
                    && r.sender_name == new_request.sender_name
                    && r.status == RequestStatus::Pending
            });
            if already_pending {
                return Err(StoreError::Conflict(
                    "a handshake with this tag is already pending".to_string(),
                ));
            }

            let request = ConnectionRequest {
                id: format!("req-{}", Uuid::new_v4()),
                sender_name: new_request.sender_name,
                sender_logo: new_request.sender_logo,
                reason: new_request.reason,
                opportunity: new_request.opportunity,
                status: RequestStatus::Pending,
                tag_id: new_request.tag_id,
                timestamp: nt_types::now_millis(),
                accepted_at: None,
            };

            info!("{} sent {} to {}", request.sender_name, request.id, request.tag_id);
            state.requests.push(request.clone());
            Ok(request)
        })
    }

    pub fn get_request(&self, id: &str) -> Result<Option<ConnectionRequest>> {
        self.read_state(|s| s.requests.iter().find(|r| r.id == id).cloned())
    }

    /// Requests targeting any tag the node owns.
    pub fn inbound_requests(&self, name: &str) -> Result<Vec<ConnectionRequest>> {
        self.read_state(|s| {
            s.requests
                .iter()
                .filter(|r| s.tag(&r.tag_id).is_some_and(|t| t.owner == name))
                .cloned()
                .collect()
        })
    }

    pub fn outbound_requests(&self, name: &str) -> Result<Vec<ConnectionRequest>> {
        self.read_state(|s| {
            s.requests
                .iter()
                .filter(|r| r.sender_name == name)
                .cloned()
                .collect()
        })
    }

    /// Resolve a pending request. Acceptance stamps `accepted_at` and charges
    /// the sender the handshake fee in the same write; both outcomes are final.
    pub fn update_request_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<ConnectionRequest> {
        self.mutate(|state| state.resolve_request(id, status))
    }

    /// [`Database::update_request_status`] for the owner of the targeted tag,
    /// checked in the same write.
    pub fn respond_to_request(
        &self,
        id: &str,
        owner: &str,
        status: RequestStatus,
    ) -> Result<ConnectionRequest> {
        self.mutate(|state| {
            let request = state
                .requests
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| StoreError::not_found("request", id))?;
            if state.tag(&request.tag_id).map(|t| t.owner.as_str()) != Some(owner) {
                return Err(StoreError::NotOwner {
                    entity: "request",
                    key: id.to_string(),
                    name: owner.to_string(),
                });
            }
            state.resolve_request(id, status)
        })
    }
}

impl ProtocolState {
    fn resolve_request(&mut self, id: &str, status: RequestStatus) -> Result<ConnectionRequest> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("request", id))?;

        if request.status != RequestStatus::Pending || status == RequestStatus::Pending {
            return Err(StoreError::InvalidTransition {
                from: request.status,
                to: status,
            });
        }

        request.status = status;
        if status == RequestStatus::Accepted {
            request.accepted_at = Some(nt_types::now_millis());
        }
        let request = request.clone();

        if status == RequestStatus::Accepted {
            self.record(
                &request.sender_name,
                HANDSHAKE_COST,
                TxKind::Debit,
                &format!("Handshake: {id}"),
                None,
            )?;
        }

        info!("Request {} is now {}", id, status);
        Ok(request)
    }
}
