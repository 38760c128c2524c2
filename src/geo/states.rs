//! Indian states and union territories reference data
//!
//! Static tables: state names, ISO 3166-2 codes, centroids for the heatmap,
//! and the major-city index used by the resolver. 28 states + 8 union
//! territories.

/// A state (or union territory) reference row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateInfo {
    /// Canonical state name
    pub name: &'static str,
    /// ISO 3166-2 code
    pub iso_code: &'static str,
    /// Centroid latitude
    pub lat: f64,
    /// Centroid longitude
    pub lon: f64,
}

/// All states and union territories
pub const STATES: &[StateInfo] = &[
    StateInfo { name: "Andhra Pradesh", iso_code: "IN-AP", lat: 15.9129, lon: 79.7400 },
    StateInfo { name: "Arunachal Pradesh", iso_code: "IN-AR", lat: 28.2180, lon: 94.7278 },
    StateInfo { name: "Assam", iso_code: "IN-AS", lat: 26.2006, lon: 92.9376 },
    StateInfo { name: "Bihar", iso_code: "IN-BR", lat: 25.0961, lon: 85.3131 },
    StateInfo { name: "Chhattisgarh", iso_code: "IN-CT", lat: 21.2787, lon: 81.8661 },
    StateInfo { name: "Goa", iso_code: "IN-GA", lat: 15.2993, lon: 74.1240 },
    StateInfo { name: "Gujarat", iso_code: "IN-GJ", lat: 22.2587, lon: 71.1924 },
    StateInfo { name: "Haryana", iso_code: "IN-HR", lat: 29.0588, lon: 76.0856 },
    StateInfo { name: "Himachal Pradesh", iso_code: "IN-HP", lat: 31.1048, lon: 77.1734 },
    StateInfo { name: "Jharkhand", iso_code: "IN-JH", lat: 23.6102, lon: 85.2799 },
    StateInfo { name: "Karnataka", iso_code: "IN-KA", lat: 15.3173, lon: 75.7139 },
    StateInfo { name: "Kerala", iso_code: "IN-KL", lat: 10.8505, lon: 76.2711 },
    StateInfo { name: "Madhya Pradesh", iso_code: "IN-MP", lat: 22.9734, lon: 78.6569 },
    StateInfo { name: "Maharashtra", iso_code: "IN-MH", lat: 19.7515, lon: 75.7139 },
    StateInfo { name: "Manipur", iso_code: "IN-MN", lat: 24.6637, lon: 93.9063 },
    StateInfo { name: "Meghalaya", iso_code: "IN-ML", lat: 25.4670, lon: 91.3662 },
    StateInfo { name: "Mizoram", iso_code: "IN-MZ", lat: 23.1645, lon: 92.9376 },
    StateInfo { name: "Nagaland", iso_code: "IN-NL", lat: 26.1584, lon: 94.5624 },
    StateInfo { name: "Odisha", iso_code: "IN-OR", lat: 20.9517, lon: 85.0985 },
    StateInfo { name: "Punjab", iso_code: "IN-PB", lat: 31.1471, lon: 75.3412 },
    StateInfo { name: "Rajasthan", iso_code: "IN-RJ", lat: 27.0238, lon: 74.2179 },
    StateInfo { name: "Sikkim", iso_code: "IN-SK", lat: 27.5330, lon: 88.5122 },
    StateInfo { name: "Tamil Nadu", iso_code: "IN-TN", lat: 11.1271, lon: 78.6569 },
    StateInfo { name: "Telangana", iso_code: "IN-TG", lat: 18.1124, lon: 79.0193 },
    StateInfo { name: "Tripura", iso_code: "IN-TR", lat: 23.9408, lon: 91.9882 },
    StateInfo { name: "Uttar Pradesh", iso_code: "IN-UP", lat: 26.8467, lon: 80.9462 },
    StateInfo { name: "Uttarakhand", iso_code: "IN-UT", lat: 30.0668, lon: 79.0193 },
    StateInfo { name: "West Bengal", iso_code: "IN-WB", lat: 22.9868, lon: 87.8550 },
    StateInfo { name: "Delhi", iso_code: "IN-DL", lat: 28.7041, lon: 77.1025 },
    StateInfo { name: "Jammu and Kashmir", iso_code: "IN-JK", lat: 33.7782, lon: 76.5762 },
    StateInfo { name: "Ladakh", iso_code: "IN-LA", lat: 34.1526, lon: 77.5771 },
    StateInfo { name: "Chandigarh", iso_code: "IN-CH", lat: 30.7333, lon: 76.7794 },
    StateInfo { name: "Dadra and Nagar Haveli and Daman and Diu", iso_code: "IN-DH", lat: 20.1809, lon: 73.0169 },
    StateInfo { name: "Puducherry", iso_code: "IN-PY", lat: 11.9416, lon: 79.8083 },
    StateInfo { name: "Andaman and Nicobar Islands", iso_code: "IN-AN", lat: 11.7401, lon: 92.6586 },
    StateInfo { name: "Lakshadweep", iso_code: "IN-LD", lat: 10.5667, lon: 72.6417 },
];

/// Major cities: `(city, state)`
pub const CITIES: &[(&str, &str)] = &[
    ("Mumbai", "Maharashtra"),
    ("Pune", "Maharashtra"),
    ("Nagpur", "Maharashtra"),
    ("Nashik", "Maharashtra"),
    ("Ahmedabad", "Gujarat"),
    ("Surat", "Gujarat"),
    ("Vadodara", "Gujarat"),
    ("Rajkot", "Gujarat"),
    ("Bengaluru", "Karnataka"),
    ("Mysuru", "Karnataka"),
    ("Mangaluru", "Karnataka"),
    ("Hubballi", "Karnataka"),
    ("Chennai", "Tamil Nadu"),
    ("Coimbatore", "Tamil Nadu"),
    ("Madurai", "Tamil Nadu"),
    ("Hyderabad", "Telangana"),
    ("Warangal", "Telangana"),
    ("New Delhi", "Delhi"),
    ("Kolkata", "West Bengal"),
    ("Howrah", "West Bengal"),
    ("Lucknow", "Uttar Pradesh"),
    ("Kanpur", "Uttar Pradesh"),
    ("Varanasi", "Uttar Pradesh"),
    ("Agra", "Uttar Pradesh"),
    ("Jaipur", "Rajasthan"),
    ("Jodhpur", "Rajasthan"),
    ("Udaipur", "Rajasthan"),
    ("Bhopal", "Madhya Pradesh"),
    ("Indore", "Madhya Pradesh"),
    ("Gwalior", "Madhya Pradesh"),
    ("Patna", "Bihar"),
    ("Gaya", "Bihar"),
    ("Bhubaneswar", "Odisha"),
    ("Cuttack", "Odisha"),
    ("Kochi", "Kerala"),
    ("Thiruvananthapuram", "Kerala"),
    ("Kozhikode", "Kerala"),
    ("Visakhapatnam", "Andhra Pradesh"),
    ("Vijayawada", "Andhra Pradesh"),
    ("Guwahati", "Assam"),
    ("Ranchi", "Jharkhand"),
    ("Jamshedpur", "Jharkhand"),
    ("Raipur", "Chhattisgarh"),
    ("Amritsar", "Punjab"),
    ("Ludhiana", "Punjab"),
    ("Gurugram", "Haryana"),
    ("Faridabad", "Haryana"),
    ("Dehradun", "Uttarakhand"),
    ("Shimla", "Himachal Pradesh"),
    ("Panaji", "Goa"),
    ("Srinagar", "Jammu and Kashmir"),
    ("Leh", "Ladakh"),
    ("Imphal", "Manipur"),
    ("Shillong", "Meghalaya"),
    ("Aizawl", "Mizoram"),
    ("Kohima", "Nagaland"),
    ("Gangtok", "Sikkim"),
    ("Agartala", "Tripura"),
    ("Itanagar", "Arunachal Pradesh"),
    ("Port Blair", "Andaman and Nicobar Islands"),
];

/// Look up a state row by canonical name (case-insensitive)
pub fn state_info(name: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Centroid for a state, if known
pub fn state_centroid(name: &str) -> Option<(f64, f64)> {
    state_info(name).map(|s| (s.lat, s.lon))
}
