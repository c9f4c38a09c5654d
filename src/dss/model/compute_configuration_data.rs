use super::{decode_string, Nonce, RegistrationDetails, RequestHeader, KEY_NONCE};
use crate::{
    config::{CONFIGURATION_ENTRIES_MAX, CONFIGURATION_VALUE_MAX},
    error::{FfsError, FfsResult},
    json::{
        convert_value_to_string, encode_object_end, encode_object_start, encode_separator,
        encode_string_field, encode_string_key, initialize_object, key_matches,
        parse_key_value_pair, parse_object, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_CONFIGURATION: &str = "configuration";
const KEY_REGISTRATION_DETAILS: &str = "registrationDetails";

/// Locale settings exchanged during configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigurationKey {
    LanguageLocale,
    CountryCode,
    Realm,
    CountryOfResidence,
    Marketplace,
    Region,
}

impl ConfigurationKey {
    pub const ALL: [Self; 6] = [
        Self::LanguageLocale,
        Self::CountryCode,
        Self::CountryOfResidence,
        Self::Region,
        Self::Realm,
        Self::Marketplace,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LanguageLocale => "LocaleConfiguration.LanguageLocale",
            Self::CountryCode => "LocaleConfiguration.CountryCode",
            Self::Realm => "LocaleConfiguration.Realm",
            Self::CountryOfResidence => "LocaleConfiguration.CountryOfResidence",
            Self::Marketplace => "LocaleConfiguration.Marketplace",
            Self::Region => "LocaleConfiguration.Region",
        }
    }

    fn matching(key: &JsonValue<'_>) -> FfsResult<Option<Self>> {
        for candidate in Self::ALL {
            if key_matches(key, candidate.as_str())? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationEntry {
    pub key: ConfigurationKey,
    pub value: heapless::String<CONFIGURATION_VALUE_MAX>,
}

pub type Configuration = heapless::Vec<ConfigurationEntry, CONFIGURATION_ENTRIES_MAX>;

fn encode_configuration_field(
    destination: &mut StreamBuffer<'_>,
    configuration: &[ConfigurationEntry],
) -> FfsResult<()> {
    if configuration.is_empty() {
        return Ok(());
    }
    destination.transaction(|out| {
        encode_separator(out)?;
        encode_string_key(out, KEY_CONFIGURATION)?;
        encode_object_start(out)?;
        for (idx, entry) in configuration.iter().enumerate() {
            if idx > 0 {
                encode_separator(out)?;
            }
            encode_string_field(out, entry.key.as_str(), &entry.value)?;
        }
        encode_object_end(out)
    })
}

/// Every string entry under a known key; anything else is skipped.
fn decode_configuration(value: &JsonValue<'_>) -> FfsResult<Configuration> {
    let mut object = *value;
    let mut configuration = Configuration::new();
    while let Some(pair) = parse_key_value_pair(&mut object)? {
        let Some(key) = ConfigurationKey::matching(&pair.key)? else {
            continue;
        };
        if pair.value.kind() != JsonType::String {
            log::debug!("dss: configuration key={} not a string", key.as_str());
            continue;
        }
        let entry = ConfigurationEntry {
            key,
            value: convert_value_to_string(&pair.value)?,
        };
        configuration.push(entry).map_err(|_| FfsError::Overrun)?;
    }
    Ok(configuration)
}

/// `{"nonce","sessionId","deviceDetails","configuration"}`: the device's
/// current locale, if it has one.
#[derive(Clone, Copy, Debug)]
pub struct ComputeConfigurationDataRequest<'r> {
    pub header: RequestHeader<'r>,
    pub configuration: &'r [ConfigurationEntry],
}

impl ComputeConfigurationDataRequest<'_> {
    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            self.header.encode_open(out)?;
            encode_configuration_field(out, self.configuration)?;
            encode_object_end(out)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeConfigurationDataResponse {
    pub nonce: Nonce,
    pub configuration: Configuration,
    pub registration_details: Option<RegistrationDetails>,
}

impl ComputeConfigurationDataResponse {
    pub fn deserialize(json: &[u8]) -> FfsResult<Self> {
        let mut object = initialize_object(json)?;
        let mut fields = [
            JsonField::new(KEY_NONCE, JsonType::String),
            JsonField::new(KEY_CONFIGURATION, JsonType::Object),
            JsonField::new(KEY_REGISTRATION_DETAILS, JsonType::Object),
        ];
        parse_object(&mut object, &mut fields)?;
        let [nonce, configuration, registration_details] = &fields;
        let configuration = if configuration.is_empty() {
            Configuration::new()
        } else {
            decode_configuration(&configuration.value)?
        };
        let registration_details = if registration_details.is_empty() {
            None
        } else {
            Some(RegistrationDetails::deserialize(&registration_details.value)?)
        };
        Ok(Self {
            nonce: decode_string(nonce)?,
            configuration,
            registration_details,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, &self.nonce)?;
            encode_configuration_field(out, &self.configuration)?;
            if let Some(details) = &self.registration_details {
                encode_separator(out)?;
                encode_string_key(out, KEY_REGISTRATION_DETAILS)?;
                details.serialize(out)?;
            }
            encode_object_end(out)
        })
    }
}
