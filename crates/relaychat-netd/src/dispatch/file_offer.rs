use bytes::Bytes;
use relaychat_proto::codec::encode_message;
use relaychat_proto::messages::file::{FileOffer, FileOfferResponse, FileOfferResult};
use relaychat_proto::messages::Message;
use tracing::{info, warn};

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::roster::Roster;
use crate::transfer::TransferTable;

/// Forward a targeted file offer and install the rendezvous record.
///
/// Offers are targeted-only; the receiver slot stays unassigned until the
/// target accepts. Rejections go back in-band as offer responses.
pub(crate) fn handle(
    conn_id: ConnId,
    frame: &FrameOwned,
    conns: &mut ConnTable,
    roster: &Roster,
    transfers: &mut TransferTable,
) {
    let offer = match FileOffer::decode_body(&frame.body) {
        Ok(offer) => offer,
        Err(e) => {
            warn!(conn_id, error = %e, "malformed file offer");
            return;
        }
    };

    let Some(sender) = roster.get(conn_id).filter(|s| s.online) else {
        warn!(conn_id, "file offer from connection without a session (ignored)");
        return;
    };

    let sequence = frame.header.sequence;

    if offer.file_id.is_empty() {
        reject(conns, conn_id, sequence, "", FileOfferResult::Decline, "Invalid file id");
        return;
    }
    if offer.to_id.is_empty() {
        reject(conns, conn_id, sequence, &offer.file_id, FileOfferResult::Decline, "Target required");
        return;
    }
    let Some(target) = roster.conn_by_client_id(&offer.to_id) else {
        reject(conns, conn_id, sequence, &offer.file_id, FileOfferResult::Busy, "Target offline");
        return;
    };

    let forwarded = FileOffer {
        file_id: offer.file_id.clone(),
        from_id: sender.client_id.clone(),
        from_nick: sender.nickname.clone(),
        to_id: offer.to_id.clone(),
        file_size: offer.file_size,
        file_name: offer.file_name,
    };
    conns.send(target, Bytes::from(encode_message(sequence, &forwarded)));

    transfers.insert(offer.file_id.clone(), conn_id);
    info!(
        conn_id,
        target,
        file_id = %offer.file_id,
        to_id = %offer.to_id,
        file_size = offer.file_size,
        "file offer forwarded"
    );
}

fn reject(
    conns: &mut ConnTable,
    conn_id: ConnId,
    sequence: u32,
    file_id: &str,
    result: FileOfferResult,
    message: &str,
) {
    let rsp = FileOfferResponse::new(file_id, result, message);
    conns.send(conn_id, Bytes::from(encode_message(sequence, &rsp)));
}
