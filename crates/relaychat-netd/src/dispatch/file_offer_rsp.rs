use bytes::Bytes;
use relaychat_proto::codec::encode_message;
use relaychat_proto::messages::file::{FileOfferResponse, FileOfferResult};
use relaychat_proto::messages::Message;
use tracing::{debug, info, warn};

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::transfer::TransferTable;

/// Route an offer response back to the offering side.
///
/// While the session is unassigned, an ACCEPT from anyone binds that
/// connection as the receiver and a non-ACCEPT tears the session down
/// without a forward. Once bound, only the bound receiver may speak for
/// the session; responses from anyone else are dropped.
pub(crate) fn handle(
    conn_id: ConnId,
    frame: &FrameOwned,
    conns: &mut ConnTable,
    transfers: &mut TransferTable,
) {
    let rsp = match FileOfferResponse::decode_body(&frame.body) {
        Ok(rsp) => rsp,
        Err(e) => {
            warn!(conn_id, error = %e, "malformed file offer response");
            return;
        }
    };
    if rsp.file_id.is_empty() {
        warn!(conn_id, "file offer response without file id (ignored)");
        return;
    }

    let Some(session) = transfers.get(&rsp.file_id) else {
        warn!(conn_id, file_id = %rsp.file_id, "offer response for unknown file session");
        return;
    };

    let accepted = rsp.result == FileOfferResult::Accept.as_u32();

    match session.receiver {
        Some(receiver) if receiver != conn_id => {
            warn!(
                conn_id,
                receiver,
                file_id = %rsp.file_id,
                "offer response from unexpected connection (ignored)"
            );
            return;
        }
        Some(_) => {
            if !accepted {
                transfers.remove(&rsp.file_id);
                info!(conn_id, file_id = %rsp.file_id, "file transfer cancelled by receiver");
            }
        }
        None => {
            if accepted {
                transfers.bind_receiver(&rsp.file_id, conn_id);
                info!(conn_id, file_id = %rsp.file_id, "file transfer receiver bound");
            } else {
                // Nobody ever owned the receiving side; reclaim quietly.
                transfers.remove(&rsp.file_id);
                debug!(conn_id, file_id = %rsp.file_id, "unassigned file offer declined");
                return;
            }
        }
    }

    let forwarded = FileOfferResponse {
        file_id: rsp.file_id,
        result: rsp.result,
        message: rsp.message,
    };
    conns.send(
        session.sender,
        Bytes::from(encode_message(frame.header.sequence, &forwarded)),
    );
}
