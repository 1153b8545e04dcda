use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use coc_ledger::RecordCodec;
use coc_protocol::TransactionResource;
use coc_types::{CustodyRecord, FAMILY_NAME};
use serde::{Deserialize, Serialize};

/// A decoded custody record together with who signed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRecord {
    pub transaction_id: String,
    pub signer_public_key: String,
    pub record: CustodyRecord,
}

impl SignedRecord {
    fn instant(&self) -> Option<NaiveDateTime> {
        self.record.registration_instant()
    }
}

/// All records for one case number, newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseHistory {
    pub case_num: String,
    pub records: Vec<SignedRecord>,
}

impl CaseHistory {
    pub fn latest(&self) -> Option<&SignedRecord> {
        self.records.first()
    }
}

/// One display row of the "my transactions" view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub registration_time: Option<String>,
    pub transaction_id: String,
    pub case_num: Option<String>,
    pub image_file_name: Option<String>,
    pub device_type: Option<String>,
    pub status: Option<String>,
    pub image_type: Option<String>,
}

/// Pure read-side views over committed transactions.
pub struct TransactionQuery;

impl TransactionQuery {
    /// Decode custody payloads. Other families and undecodable payloads are
    /// skipped with a warning.
    pub fn decode(resources: &[TransactionResource]) -> Vec<SignedRecord> {
        resources
            .iter()
            .filter(|tx| tx.header.family_name.is_empty() || tx.header.family_name == FAMILY_NAME)
            .filter_map(|tx| {
                let decoded = tx
                    .payload_bytes()
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| RecordCodec::decode_payload(&bytes).map_err(|e| e.to_string()));
                match decoded {
                    Ok(record) => Some(SignedRecord {
                        transaction_id: tx.header_signature.clone(),
                        signer_public_key: tx.header.signer_public_key.clone(),
                        record,
                    }),
                    Err(error) => {
                        tracing::warn!(transaction_id = %tx.header_signature, %error, "skipping undecodable payload");
                        None
                    }
                }
            })
            .collect()
    }

    /// Keep records signed by `public_key`, preserving order.
    pub fn filter_by_signer(records: Vec<SignedRecord>, public_key: &str) -> Vec<SignedRecord> {
        records
            .into_iter()
            .filter(|r| r.signer_public_key == public_key)
            .collect()
    }

    /// Group by case number. Cases are ordered by their most recent record,
    /// newest first, and records within a case are newest first. Records
    /// whose registration time does not parse sort after all others.
    pub fn group_by_case(records: Vec<SignedRecord>) -> Vec<CaseHistory> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut cases: Vec<CaseHistory> = Vec::new();
        for record in records {
            let case_num = record.record.case_num.clone().unwrap_or_default();
            let slot = *index.entry(case_num.clone()).or_insert_with(|| {
                cases.push(CaseHistory {
                    case_num,
                    records: Vec::new(),
                });
                cases.len() - 1
            });
            cases[slot].records.push(record);
        }

        for case in &mut cases {
            case.records
                .sort_by(|a, b| newest_first(a.instant(), b.instant()));
        }
        cases.sort_by(|a, b| {
            newest_first(
                a.latest().and_then(SignedRecord::instant),
                b.latest().and_then(SignedRecord::instant),
            )
        });
        cases
    }

    /// Flatten grouped history into display rows, in group order.
    pub fn summarize(cases: &[CaseHistory]) -> Vec<TransactionSummary> {
        cases
            .iter()
            .flat_map(|case| case.records.iter())
            .map(|r| TransactionSummary {
                registration_time: r.record.registration_time.clone(),
                transaction_id: r.transaction_id.clone(),
                case_num: r.record.case_num.clone(),
                image_file_name: r.record.image_file_name.clone(),
                device_type: r.record.device_type.as_ref().map(|d| d.to_string()),
                status: r.record.status.as_ref().map(|s| s.to_string()),
                image_type: r.record.image_type.clone(),
            })
            .collect()
    }
}

fn newest_first(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coc_protocol::HeaderResource;
    use coc_types::CustodyStatus;

    fn signed(id: &str, signer: &str, case: &str, time: &str) -> SignedRecord {
        SignedRecord {
            transaction_id: id.into(),
            signer_public_key: signer.into(),
            record: CustodyRecord {
                case_num: Some(case.into()),
                registration_time: Some(time.into()),
                status: Some(CustodyStatus::Stored),
                ..Default::default()
            },
        }
    }

    fn ids(case: &CaseHistory) -> Vec<&str> {
        case.records.iter().map(|r| r.transaction_id.as_str()).collect()
    }

    #[test]
    fn groups_cases_newest_first() {
        let records = vec![
            signed("b1", "k", "B", "2024-01-02T10:00"),
            signed("a1", "k", "A", "2024-01-01T10:00"),
            signed("b2", "k", "B", "2024-01-04T08:00"),
            signed("a2", "k", "A", "2024-01-03T10:00"),
        ];
        let cases = TransactionQuery::group_by_case(records);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_num, "B");
        assert_eq!(ids(&cases[0]), vec!["b2", "b1"]);
        assert_eq!(cases[1].case_num, "A");
        assert_eq!(ids(&cases[1]), vec!["a2", "a1"]);

        let rows = TransactionQuery::summarize(&cases);
        let order: Vec<_> = rows.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(order, vec!["b2", "b1", "a2", "a1"]);
    }

    #[test]
    fn unparseable_times_sort_last() {
        let records = vec![
            signed("x", "k", "A", "sometime"),
            signed("y", "k", "A", "2024-01-01T10:00"),
            signed("z", "k", "B", "never"),
        ];
        let cases = TransactionQuery::group_by_case(records);
        assert_eq!(cases[0].case_num, "A");
        assert_eq!(ids(&cases[0]), vec!["y", "x"]);
        assert_eq!(cases[1].case_num, "B");
    }

    #[test]
    fn filter_keeps_order_and_signer() {
        let records = vec![
            signed("1", "me", "A", "2024-01-01T10:00"),
            signed("2", "you", "A", "2024-01-02T10:00"),
            signed("3", "me", "B", "2024-01-03T10:00"),
        ];
        let mine = TransactionQuery::filter_by_signer(records, "me");
        let ids: Vec<_> = mine.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn decode_skips_foreign_and_broken_payloads() {
        let good = TransactionResource::new(
            coc_protocol::TransactionHeader {
                family_name: "coc".into(),
                family_version: "1.0".into(),
                inputs: vec![],
                outputs: vec![],
                signer_public_key: "me".into(),
                batcher_public_key: "me".into(),
                nonce: "n".into(),
                dependencies: vec![],
                payload_sha512: String::new(),
            },
            "tx1".into(),
            br#"{"caseNum":"A"}"#,
        );
        let broken = TransactionResource {
            header: HeaderResource {
                family_name: "coc".into(),
                ..Default::default()
            },
            header_signature: "tx2".into(),
            payload: "not base64!".into(),
        };
        let foreign = TransactionResource {
            header: HeaderResource {
                family_name: "intkey".into(),
                ..Default::default()
            },
            header_signature: "tx3".into(),
            payload: "e30=".into(),
        };

        let decoded = TransactionQuery::decode(&[good, broken, foreign]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].transaction_id, "tx1");
        assert_eq!(decoded[0].signer_public_key, "me");
        assert_eq!(decoded[0].record.case_num.as_deref(), Some("A"));
    }

    #[test]
    fn summarize_flattens_in_group_order() {
        let cases = TransactionQuery::group_by_case(vec![
            signed("a1", "k", "A", "2024-01-01T10:00"),
            signed("b1", "k", "B", "2024-01-02T10:00"),
        ]);
        let rows = TransactionQuery::summarize(&cases);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].transaction_id, "b1");
        assert_eq!(rows[0].status.as_deref(), Some("stored"));
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["transactionId"], "b1");
    }
}
