//! Compiles one watchlist event entry into a concrete log filter.
//!
//! Filter parameters arrive as untyped JSON scalars. Each value is typed
//! first (integer if it parses as one, string otherwise) because the
//! upstream filter API distinguishes block numbers from block-reference
//! keywords such as "latest" and "pending". The compiled request is pure
//! data; the manager installs it against the node afterwards.

use alloy::{
    json_abi::Event,
    primitives::{Address, B256, I256, U256, hex, keccak256},
    rpc::types::{BlockNumberOrTag, Filter},
};

use crate::{config::watchlist::ArgumentFilters, managers::blockchain::error::BlockchainError};

const FROM_BLOCK_PARAM: &str = "fromBlock";
const TO_BLOCK_PARAM: &str = "toBlock";

/// A typed filter-parameter value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterParam {
    Int(i64),
    Str(String),
}

/// Everything needed to install one event filter, with parameters typed
/// and in watchlist order.
#[derive(Debug, Clone)]
pub(crate) struct FilterRequest {
    pub contract_address: Address,
    pub event: Event,
    pub params: Vec<(String, FilterParam)>,
}

/// Type each filter value, preserving insertion order. Integer JSON values
/// and strings that parse as integers become `Int`; all other strings stay
/// `Str`. Non-scalar values are rejected.
pub(crate) fn typed_params(
    filters: &ArgumentFilters,
) -> Result<Vec<(String, FilterParam)>, BlockchainError> {
    let mut params = Vec::with_capacity(filters.len());

    for (name, value) in filters {
        let param = match value {
            serde_json::Value::Number(n) => {
                let int = n
                    .as_i64()
                    .ok_or_else(|| BlockchainError::InvalidFilterValue {
                        param: name.clone(),
                    })?;
                FilterParam::Int(int)
            }
            serde_json::Value::String(s) => match s.parse::<i64>() {
                Ok(int) => FilterParam::Int(int),
                Err(_) => FilterParam::Str(s.clone()),
            },
            _ => {
                return Err(BlockchainError::InvalidFilterValue {
                    param: name.clone(),
                });
            }
        };
        params.push((name.clone(), param));
    }

    Ok(params)
}

pub(crate) fn compile_filter_request(
    contract_address: Address,
    event: Event,
    filters: &ArgumentFilters,
) -> Result<FilterRequest, BlockchainError> {
    Ok(FilterRequest {
        contract_address,
        event,
        params: typed_params(filters)?,
    })
}

/// Build the concrete log filter for a compiled request.
///
/// `fromBlock`/`toBlock` become the block range; every other parameter must
/// name an indexed event input and becomes an equality constraint on the
/// corresponding topic, encoded by the input's Solidity type.
pub(crate) fn build_filter(request: &FilterRequest) -> Result<Filter, BlockchainError> {
    let mut filter = Filter::new()
        .address(request.contract_address)
        .event_signature(request.event.selector());

    for (name, value) in &request.params {
        match name.as_str() {
            FROM_BLOCK_PARAM => {
                filter = filter.from_block(block_reference(name, value)?);
            }
            TO_BLOCK_PARAM => {
                filter = filter.to_block(block_reference(name, value)?);
            }
            _ => {
                let indexed_position = request
                    .event
                    .inputs
                    .iter()
                    .filter(|input| input.indexed)
                    .position(|input| input.name == *name);

                let Some(position) = indexed_position else {
                    return Err(BlockchainError::UnknownFilterParameter {
                        param: name.clone(),
                        event: request.event.name.clone(),
                    });
                };

                let solidity_type = request
                    .event
                    .inputs
                    .iter()
                    .filter(|input| input.indexed)
                    .nth(position)
                    .map(|input| input.ty.clone())
                    .unwrap_or_default();

                let topic = encode_topic(&solidity_type, name, value)?;
                filter = match position {
                    0 => filter.topic1(topic),
                    1 => filter.topic2(topic),
                    2 => filter.topic3(topic),
                    _ => {
                        return Err(BlockchainError::TooManyTopics {
                            event: request.event.name.clone(),
                        });
                    }
                };
            }
        }
    }

    Ok(filter)
}

fn block_reference(param: &str, value: &FilterParam) -> Result<BlockNumberOrTag, BlockchainError> {
    match value {
        FilterParam::Int(n) if *n >= 0 => Ok(BlockNumberOrTag::Number(*n as u64)),
        FilterParam::Int(n) => Err(BlockchainError::InvalidBlockReference {
            param: param.to_string(),
            value: n.to_string(),
        }),
        FilterParam::Str(s) => {
            s.parse::<BlockNumberOrTag>()
                .map_err(|_| BlockchainError::InvalidBlockReference {
                    param: param.to_string(),
                    value: s.clone(),
                })
        }
    }
}

/// Encode a scalar filter value into the 32-byte topic form dictated by the
/// indexed input's Solidity type.
fn encode_topic(
    solidity_type: &str,
    param: &str,
    value: &FilterParam,
) -> Result<B256, BlockchainError> {
    match value {
        FilterParam::Int(n) => {
            if *n >= 0 {
                Ok(B256::from(U256::from(*n as u64)))
            } else {
                Ok(B256::from(I256::try_from(*n).unwrap_or_default().into_raw()))
            }
        }
        FilterParam::Str(s) => match solidity_type {
            "address" => {
                let address =
                    s.parse::<Address>()
                        .map_err(|_| BlockchainError::UnencodableFilterValue {
                            param: param.to_string(),
                            solidity_type: solidity_type.to_string(),
                        })?;
                Ok(B256::left_padding_from(address.as_slice()))
            }
            // Dynamic types are indexed by their keccak hash
            "string" | "bytes" => Ok(keccak256(s.as_bytes())),
            t if t.starts_with("bytes") => {
                let bytes =
                    hex::decode(s).map_err(|_| BlockchainError::UnencodableFilterValue {
                        param: param.to_string(),
                        solidity_type: solidity_type.to_string(),
                    })?;
                if bytes.len() > 32 {
                    return Err(BlockchainError::UnencodableFilterValue {
                        param: param.to_string(),
                        solidity_type: solidity_type.to_string(),
                    });
                }
                Ok(B256::right_padding_from(&bytes))
            }
            t if t.starts_with("uint") || t.starts_with("int") => {
                let number =
                    s.parse::<U256>()
                        .map_err(|_| BlockchainError::UnencodableFilterValue {
                            param: param.to_string(),
                            solidity_type: solidity_type.to_string(),
                        })?;
                Ok(B256::from(number))
            }
            "bool" => match s.as_str() {
                "true" => Ok(B256::from(U256::from(1u64))),
                "false" => Ok(B256::ZERO),
                _ => Err(BlockchainError::UnencodableFilterValue {
                    param: param.to_string(),
                    solidity_type: solidity_type.to_string(),
                }),
            },
            _ => Err(BlockchainError::UnencodableFilterValue {
                param: param.to_string(),
                solidity_type: solidity_type.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use alloy::rpc::types::FilterBlockOption;

    use super::*;

    fn event_from_json(json: serde_json::Value) -> Event {
        serde_json::from_value(json).unwrap()
    }

    fn pair_created() -> Event {
        event_from_json(serde_json::json!({
            "type": "event",
            "name": "PairCreated",
            "anonymous": false,
            "inputs": [
                {"name": "token0", "type": "address", "indexed": true},
                {"name": "token1", "type": "address", "indexed": true},
                {"name": "pair", "type": "address", "indexed": false},
                {"name": "", "type": "uint256", "indexed": false}
            ]
        }))
    }

    fn filters(json: serde_json::Value) -> ArgumentFilters {
        match json {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn string_keyword_stays_string() {
        let params = typed_params(&filters(serde_json::json!({"fromBlock": "latest"}))).unwrap();
        assert_eq!(
            params,
            vec![(
                "fromBlock".to_string(),
                FilterParam::Str("latest".to_string())
            )]
        );
    }

    #[test]
    fn integers_are_typed_in_given_order() {
        let params =
            typed_params(&filters(serde_json::json!({"fromBlock": 100, "toBlock": 200}))).unwrap();
        assert_eq!(
            params,
            vec![
                ("fromBlock".to_string(), FilterParam::Int(100)),
                ("toBlock".to_string(), FilterParam::Int(200)),
            ]
        );
    }

    #[test]
    fn numeric_strings_become_integers() {
        let params = typed_params(&filters(serde_json::json!({"fromBlock": "100"}))).unwrap();
        assert_eq!(params[0].1, FilterParam::Int(100));
    }

    #[test]
    fn single_string_parameter() {
        let params = typed_params(&filters(serde_json::json!({"Y": "Z"}))).unwrap();
        assert_eq!(
            params,
            vec![("Y".to_string(), FilterParam::Str("Z".to_string()))]
        );
    }

    #[test]
    fn empty_filters_produce_zero_parameters() {
        let params = typed_params(&filters(serde_json::json!({}))).unwrap();
        assert!(params.is_empty());

        let request = FilterRequest {
            contract_address: Address::ZERO,
            event: pair_created(),
            params,
        };
        let filter = build_filter(&request).unwrap();
        assert!(filter.topics[1].is_empty());
        assert!(filter.topics[2].is_empty());
        assert!(filter.topics[3].is_empty());
    }

    #[test]
    fn non_scalar_value_is_rejected() {
        let err = typed_params(&filters(serde_json::json!({"x": [1, 2]}))).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidFilterValue { .. }));
    }

    #[test]
    fn block_range_keywords_and_numbers() {
        let request = compile_filter_request(
            Address::ZERO,
            pair_created(),
            &filters(serde_json::json!({"fromBlock": 100, "toBlock": "pending"})),
        )
        .unwrap();
        let filter = build_filter(&request).unwrap();

        let FilterBlockOption::Range {
            from_block,
            to_block,
        } = filter.block_option
        else {
            panic!("expected block range");
        };
        assert_eq!(from_block, Some(BlockNumberOrTag::Number(100)));
        assert_eq!(to_block, Some(BlockNumberOrTag::Pending));
    }

    #[test]
    fn indexed_address_parameter_becomes_topic() {
        let token0 = "0x00000000006c3852cbef3e08e8df289169ede581";
        let request = compile_filter_request(
            Address::ZERO,
            pair_created(),
            &filters(serde_json::json!({"token0": token0})),
        )
        .unwrap();
        let filter = build_filter(&request).unwrap();

        let expected = B256::left_padding_from(token0.parse::<Address>().unwrap().as_slice());
        assert!(!filter.topics[1].is_empty());
        assert!(filter.topics[1].matches(&expected));
        assert!(filter.topics[2].is_empty());
    }

    #[test]
    fn indexed_string_parameter_is_hashed() {
        let event = event_from_json(serde_json::json!({
            "type": "event",
            "name": "X",
            "anonymous": false,
            "inputs": [
                {"name": "Y", "type": "string", "indexed": true}
            ]
        }));
        let request =
            compile_filter_request(Address::ZERO, event, &filters(serde_json::json!({"Y": "Z"})))
                .unwrap();
        let filter = build_filter(&request).unwrap();
        assert!(filter.topics[1].matches(&keccak256("Z".as_bytes())));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let request = compile_filter_request(
            Address::ZERO,
            pair_created(),
            &filters(serde_json::json!({"nosuch": "x"})),
        )
        .unwrap();
        let err = build_filter(&request).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::UnknownFilterParameter { .. }
        ));
    }

    #[test]
    fn non_indexed_parameter_is_rejected() {
        // "pair" exists on the event but is not indexed, so it cannot be
        // used as a topic constraint.
        let request = compile_filter_request(
            Address::ZERO,
            pair_created(),
            &filters(serde_json::json!({"pair": "0x00000000006c3852cbef3e08e8df289169ede581"})),
        )
        .unwrap();
        let err = build_filter(&request).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::UnknownFilterParameter { .. }
        ));
    }
}
